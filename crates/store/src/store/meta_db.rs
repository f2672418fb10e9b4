use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

const MIGRATION_V1_SQL: &str = r#"
CREATE TABLE pages (
    project             TEXT NOT NULL,
    slug                TEXT NOT NULL,
    content             TEXT NOT NULL,
    current_version     INTEGER NULL,
    updated_at          TEXT NOT NULL,
    PRIMARY KEY (project, slug)
);

CREATE TABLE page_versions (
    project             TEXT NOT NULL,
    slug                TEXT NOT NULL,
    version             INTEGER NOT NULL CHECK (version > 0),
    content             TEXT NOT NULL,
    content_hash        TEXT NOT NULL,
    edit_prompt         TEXT NULL,
    created_by          TEXT NOT NULL CHECK (created_by IN ('generation', 'edit', 'revert')),
    reverted_from       INTEGER NULL,
    created_at          TEXT NOT NULL,
    superseded_at       TEXT NULL,
    PRIMARY KEY (project, slug, version)
);
"#;

const MIGRATION_V2_SQL: &str = r#"
CREATE TABLE comment_threads (
    id                  TEXT PRIMARY KEY,
    project             TEXT NOT NULL,
    slug                TEXT NOT NULL,
    anchor_text         TEXT NULL,
    anchor_prefix       TEXT NULL,
    anchor_suffix       TEXT NULL,
    status              TEXT NOT NULL CHECK (status IN ('open', 'resolved')),
    version             INTEGER NOT NULL,
    created_at          TEXT NOT NULL,
    resolved_at         TEXT NULL
);

CREATE INDEX comment_threads_page_idx
    ON comment_threads (project, slug, created_at);

CREATE TABLE comment_messages (
    id                  TEXT PRIMARY KEY,
    thread_id           TEXT NOT NULL REFERENCES comment_threads (id) ON DELETE CASCADE,
    author              TEXT NOT NULL,
    body                TEXT NOT NULL,
    created_at          TEXT NOT NULL
);

CREATE INDEX comment_messages_thread_idx
    ON comment_messages (thread_id, created_at);
"#;

const MIGRATIONS: &[(i64, &str)] = &[(1, MIGRATION_V1_SQL), (2, MIGRATION_V2_SQL)];

#[derive(Debug)]
pub struct MetaDb {
    conn: Connection,
}

impl MetaDb {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create meta.db parent directory `{}`", parent.display())
            })?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("failed to open meta.db at `{}`", path.display()))?;
        Self::init(conn)
    }

    /// Private in-memory database, used by tests and one-shot tooling.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory meta.db")?;
        Self::init(conn)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA busy_timeout = 5000;
            ",
        )
        .context("failed to configure sqlite pragmas for meta.db")?;

        ensure_migration_table(&conn)?;
        apply_pending_migrations(&mut conn)?;

        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    pub fn schema_version(&self) -> Result<i64> {
        current_schema_version(&self.conn)
    }
}

fn ensure_migration_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY,
            applied_at  TEXT NOT NULL
        );
        ",
    )
    .context("failed to ensure schema_migrations table exists")
}

fn current_schema_version(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_migrations", [], |row| row.get(0))
        .context("failed to read current schema version")
}

fn apply_pending_migrations(conn: &mut Connection) -> Result<()> {
    let mut current_version = current_schema_version(conn)?;

    for (version, sql) in MIGRATIONS {
        if *version <= current_version {
            continue;
        }

        let tx = conn.transaction().context("failed to start migration transaction")?;
        tx.execute_batch(sql)
            .with_context(|| format!("failed to apply meta.db migration v{version}"))?;
        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, datetime('now'))",
            params![version],
        )
        .with_context(|| format!("failed to record migration v{version}"))?;
        tx.commit().with_context(|| format!("failed to commit migration v{version}"))?;
        current_version = *version;
    }

    Ok(())
}
