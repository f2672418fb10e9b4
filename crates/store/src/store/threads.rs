// Comment thread persistence in `comment_threads` / `comment_messages`.
//
// Messages are immutable once written; saving a thread only inserts the ones
// that are not stored yet.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use quillwiki_common::anchor::TextAnchor;
use quillwiki_common::key::PageKey;
use quillwiki_common::types::{AnnotationThread, ThreadMessage, ThreadStatus};

use super::pages::parse_timestamp;
use super::CommentStore;

const THREAD_COLUMNS: &str = "id, project, slug, anchor_text, anchor_prefix, anchor_suffix, \
                              status, version, created_at, resolved_at";

pub struct SqliteCommentStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteCommentStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn load_messages(&self, thread_id: Uuid) -> Result<Vec<ThreadMessage>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, author, body, created_at FROM comment_messages \
                 WHERE thread_id = ?1 ORDER BY created_at ASC, rowid ASC",
            )
            .context("failed to prepare comment message query")?;
        let rows = stmt
            .query_map(params![thread_id.to_string()], row_to_message)
            .context("failed to query comment messages")?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to collect comment messages")
    }

    fn with_messages(&self, mut thread: AnnotationThread) -> Result<AnnotationThread> {
        thread.messages = self.load_messages(thread.id)?;
        Ok(thread)
    }
}

impl CommentStore for SqliteCommentStore<'_> {
    fn load_thread(&self, id: Uuid) -> Result<Option<AnnotationThread>> {
        let thread = self
            .conn
            .query_row(
                &format!("SELECT {THREAD_COLUMNS} FROM comment_threads WHERE id = ?1"),
                params![id.to_string()],
                row_to_thread,
            )
            .optional()
            .context("failed to query comment thread")?;

        thread.map(|thread| self.with_messages(thread)).transpose()
    }

    fn list_threads(&self, page: &PageKey) -> Result<Vec<AnnotationThread>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {THREAD_COLUMNS} FROM comment_threads \
                 WHERE project = ?1 AND slug = ?2 ORDER BY created_at ASC, rowid ASC"
            ))
            .context("failed to prepare comment thread list query")?;
        let threads = stmt
            .query_map(params![page.project(), page.slug()], row_to_thread)
            .context("failed to query comment threads")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to collect comment threads")?;

        threads.into_iter().map(|thread| self.with_messages(thread)).collect()
    }

    fn save_thread(&self, thread: &AnnotationThread) -> Result<()> {
        let id = thread.id.to_string();
        let (text, prefix, suffix) = match &thread.anchor {
            Some(anchor) => (
                Some(anchor.text()),
                Some(anchor.prefix()),
                Some(anchor.suffix()),
            ),
            None => (None, None, None),
        };

        self.conn
            .execute(
                &format!(
                    "INSERT INTO comment_threads ({THREAD_COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
                     ON CONFLICT (id) DO UPDATE SET \
                     status = excluded.status, version = excluded.version, \
                     resolved_at = excluded.resolved_at"
                ),
                params![
                    id,
                    thread.page.project(),
                    thread.page.slug(),
                    text,
                    prefix,
                    suffix,
                    thread.status.as_str(),
                    thread.version,
                    thread.created_at.to_rfc3339(),
                    thread.resolved_at.map(|at| at.to_rfc3339()),
                ],
            )
            .with_context(|| format!("failed to store comment thread {id}"))?;

        let mut insert = self
            .conn
            .prepare(
                "INSERT OR IGNORE INTO comment_messages (id, thread_id, author, body, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .context("failed to prepare comment message insert")?;
        for message in &thread.messages {
            insert
                .execute(params![
                    message.id.to_string(),
                    id,
                    message.author,
                    message.body,
                    message.created_at.to_rfc3339(),
                ])
                .with_context(|| format!("failed to store message of thread {id}"))?;
        }
        Ok(())
    }
}

fn parse_uuid(idx: usize, raw: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_thread(row: &rusqlite::Row<'_>) -> rusqlite::Result<AnnotationThread> {
    let id_raw: String = row.get(0)?;
    let project: String = row.get(1)?;
    let slug: String = row.get(2)?;
    let page = PageKey::new(&project, &slug).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let anchor_text: Option<String> = row.get(3)?;
    let anchor = match anchor_text {
        Some(text) => {
            let prefix = row.get::<_, Option<String>>(4)?.unwrap_or_default();
            let suffix = row.get::<_, Option<String>>(5)?.unwrap_or_default();
            let anchor = TextAnchor::new(text, prefix, suffix).map_err(|e| {
                let kind = rusqlite::types::Type::Text;
                rusqlite::Error::FromSqlConversionFailure(3, kind, Box::new(e))
            })?;
            Some(anchor)
        }
        None => None,
    };

    let status_raw: String = row.get(6)?;
    let status = ThreadStatus::parse(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            6,
            rusqlite::types::Type::Text,
            format!("invalid thread status `{status_raw}`").into(),
        )
    })?;
    let created_raw: String = row.get(8)?;
    let resolved_raw: Option<String> = row.get(9)?;

    Ok(AnnotationThread {
        id: parse_uuid(0, &id_raw)?,
        page,
        anchor,
        status,
        version: row.get(7)?,
        created_at: parse_timestamp(8, &created_raw)?,
        resolved_at: resolved_raw.map(|raw| parse_timestamp(9, &raw)).transpose()?,
        messages: Vec::new(),
    })
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<ThreadMessage> {
    let id_raw: String = row.get(0)?;
    let created_raw: String = row.get(3)?;
    Ok(ThreadMessage {
        id: parse_uuid(0, &id_raw)?,
        author: row.get(1)?,
        body: row.get(2)?,
        created_at: parse_timestamp(3, &created_raw)?,
    })
}
