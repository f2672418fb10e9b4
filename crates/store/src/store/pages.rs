// Page content and version history persistence in `pages` / `page_versions`.
//
// Every stored version carries a SHA-256 of its content; a mismatch on load is
// a hard failure, as is any gap in the version numbers.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use quillwiki_common::history::{
    sha256_hex, HistoryError, PageVersion, PageVersionHistory, VersionOrigin,
};
use quillwiki_common::key::PageKey;

use super::{ContentStore, VersionStore};

/// Borrowing store over an open connection or transaction.
pub struct SqlitePageStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqlitePageStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn current_pointer(&self, page: &PageKey) -> Result<Option<u32>> {
        self.conn
            .query_row(
                "SELECT current_version FROM pages WHERE project = ?1 AND slug = ?2",
                params![page.project(), page.slug()],
                |row| row.get::<_, Option<u32>>(0),
            )
            .optional()
            .context("failed to query page pointer")
            .map(Option::flatten)
    }
}

impl ContentStore for SqlitePageStore<'_> {
    fn read_content(&self, page: &PageKey) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT content FROM pages WHERE project = ?1 AND slug = ?2",
                params![page.project(), page.slug()],
                |row| row.get(0),
            )
            .optional()
            .context("failed to query page content")
    }

    fn content_updated_at(&self, page: &PageKey) -> Result<Option<DateTime<Utc>>> {
        self.conn
            .query_row(
                "SELECT updated_at FROM pages WHERE project = ?1 AND slug = ?2",
                params![page.project(), page.slug()],
                |row| parse_timestamp(0, &row.get::<_, String>(0)?),
            )
            .optional()
            .context("failed to query page timestamp")
    }

    fn write_content(&self, page: &PageKey, content: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO pages (project, slug, content, current_version, updated_at) \
                 VALUES (?1, ?2, ?3, NULL, ?4) \
                 ON CONFLICT (project, slug) DO UPDATE SET \
                 content = excluded.content, updated_at = excluded.updated_at",
                params![page.project(), page.slug(), content, Utc::now().to_rfc3339()],
            )
            .context("failed to write page content")?;
        Ok(())
    }
}

impl VersionStore for SqlitePageStore<'_> {
    fn load_history(&self, page: &PageKey) -> Result<Option<PageVersionHistory>> {
        let Some(current) = self.current_pointer(page)? else {
            return Ok(None);
        };

        let mut stmt = self
            .conn
            .prepare(
                "SELECT version, content, content_hash, edit_prompt, created_by, reverted_from, \
                 created_at, superseded_at \
                 FROM page_versions WHERE project = ?1 AND slug = ?2 ORDER BY version ASC",
            )
            .context("failed to prepare page version query")?;
        let rows = stmt
            .query_map(params![page.project(), page.slug()], row_to_stored_version)
            .context("failed to query page versions")?;

        let mut versions = Vec::new();
        for row in rows {
            let (version, stored_hash) = row.context("failed to decode page version row")?;
            if version.content_hash() != stored_hash {
                return Err(HistoryError::HashMismatch(version.version))
                    .with_context(|| format!("page `{page}` failed integrity check"));
            }
            versions.push(version);
        }

        PageVersionHistory::from_parts(versions, current)
            .map(Some)
            .with_context(|| format!("page `{page}` has an invalid history"))
    }

    fn save_history(&self, page: &PageKey, history: &PageVersionHistory) -> Result<()> {
        let mut upsert = self
            .conn
            .prepare(
                "INSERT INTO page_versions \
                 (project, slug, version, content, content_hash, edit_prompt, created_by, \
                  reverted_from, created_at, superseded_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
                 ON CONFLICT (project, slug, version) DO UPDATE SET \
                 superseded_at = excluded.superseded_at",
            )
            .context("failed to prepare page version upsert")?;

        for version in history.versions() {
            let number = version.version;
            upsert
                .execute(params![
                    page.project(),
                    page.slug(),
                    number,
                    version.content,
                    sha256_hex(version.content.as_bytes()),
                    version.edit_prompt,
                    version.created_by.as_str(),
                    version.reverted_from,
                    version.created_at.to_rfc3339(),
                    version.superseded_at.map(|at| at.to_rfc3339()),
                ])
                .with_context(|| format!("failed to store version {number} of `{page}`"))?;
        }

        let current = history.current();
        self.conn
            .execute(
                "INSERT INTO pages (project, slug, content, current_version, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5) \
                 ON CONFLICT (project, slug) DO UPDATE SET \
                 content = excluded.content, current_version = excluded.current_version, \
                 updated_at = excluded.updated_at",
                params![
                    page.project(),
                    page.slug(),
                    current.content,
                    current.version,
                    Utc::now().to_rfc3339(),
                ],
            )
            .with_context(|| format!("failed to update pointer of `{page}`"))?;
        Ok(())
    }
}

fn row_to_stored_version(row: &rusqlite::Row<'_>) -> rusqlite::Result<(PageVersion, String)> {
    let origin_raw: String = row.get(4)?;
    let created_by = VersionOrigin::parse(&origin_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("invalid version origin `{origin_raw}`").into(),
        )
    })?;
    let created_raw: String = row.get(6)?;
    let superseded_raw: Option<String> = row.get(7)?;

    let version = PageVersion {
        version: row.get(0)?,
        content: row.get(1)?,
        edit_prompt: row.get(3)?,
        created_at: parse_timestamp(6, &created_raw)?,
        created_by,
        reverted_from: row.get(5)?,
        superseded_at: superseded_raw.map(|raw| parse_timestamp(7, &raw)).transpose()?,
    };
    Ok((version, row.get(2)?))
}

pub(crate) fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
