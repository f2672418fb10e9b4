// PageManager: owns the database and runs every read-modify-write of a page
// history or comment thread inside one IMMEDIATE transaction, which holds
// SQLite's write lock from load to save.

use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};
use uuid::Uuid;

use quillwiki_common::anchor::{TextAnchor, TextProjection};
use quillwiki_common::highlight::{HighlightOptions, Injection};
use quillwiki_common::history::{PageVersion, PageVersionHistory, VersionOrigin};
use quillwiki_common::key::PageKey;
use quillwiki_common::types::{AnnotationThread, ThreadMessage, ThreadStatus};

use crate::config::WikiConfig;
use crate::error::PageResult;
use crate::store::meta_db::MetaDb;
use crate::store::pages::SqlitePageStore;
use crate::store::threads::SqliteCommentStore;
use crate::store::{CommentStore, ContentStore, VersionStore};
use crate::{annotations, history};

/// Both SQLite stores over one connection or transaction.
struct TxStores<'c> {
    pages: SqlitePageStore<'c>,
    comments: SqliteCommentStore<'c>,
}

impl<'c> TxStores<'c> {
    fn new(conn: &'c Connection) -> Self {
        Self { pages: SqlitePageStore::new(conn), comments: SqliteCommentStore::new(conn) }
    }
}

impl ContentStore for TxStores<'_> {
    fn read_content(&self, page: &PageKey) -> anyhow::Result<Option<String>> {
        self.pages.read_content(page)
    }

    fn content_updated_at(&self, page: &PageKey) -> anyhow::Result<Option<DateTime<Utc>>> {
        self.pages.content_updated_at(page)
    }

    fn write_content(&self, page: &PageKey, content: &str) -> anyhow::Result<()> {
        self.pages.write_content(page, content)
    }
}

impl VersionStore for TxStores<'_> {
    fn load_history(&self, page: &PageKey) -> anyhow::Result<Option<PageVersionHistory>> {
        self.pages.load_history(page)
    }

    fn save_history(&self, page: &PageKey, history: &PageVersionHistory) -> anyhow::Result<()> {
        self.pages.save_history(page, history)
    }
}

impl CommentStore for TxStores<'_> {
    fn load_thread(&self, id: Uuid) -> anyhow::Result<Option<AnnotationThread>> {
        self.comments.load_thread(id)
    }

    fn list_threads(&self, page: &PageKey) -> anyhow::Result<Vec<AnnotationThread>> {
        self.comments.list_threads(page)
    }

    fn save_thread(&self, thread: &AnnotationThread) -> anyhow::Result<()> {
        self.comments.save_thread(thread)
    }
}

pub struct PageManager {
    db: MetaDb,
    highlight: HighlightOptions,
    context_chars: usize,
}

impl PageManager {
    pub fn open(path: impl AsRef<Path>, config: &WikiConfig) -> PageResult<Self> {
        Self::with_db(MetaDb::open(path)?, config)
    }

    pub fn open_in_memory(config: &WikiConfig) -> PageResult<Self> {
        Self::with_db(MetaDb::open_in_memory()?, config)
    }

    fn with_db(db: MetaDb, config: &WikiConfig) -> PageResult<Self> {
        let highlight = config.highlight.options().context("invalid highlight settings")?;
        Ok(Self { db, highlight, context_chars: config.anchors.context_chars })
    }

    // ── Writes ──────────────────────────────────────────────────────

    /// Overwrite live content without recording a version, the way content
    /// written before history tracking existed looks.
    pub fn write_untracked(&mut self, page: &PageKey, content: &str) -> PageResult<()> {
        self.write(|stores| Ok(stores.write_content(page, content)?))
    }

    pub fn ensure_history(&mut self, page: &PageKey) -> PageResult<PageVersionHistory> {
        self.write(|stores| history::ensure_history(stores, page, Utc::now()))
    }

    pub fn commit(
        &mut self,
        page: &PageKey,
        content: &str,
        edit_prompt: Option<String>,
        created_by: VersionOrigin,
        if_current: Option<u32>,
    ) -> PageResult<PageVersion> {
        self.write(|stores| {
            history::commit(stores, page, content, edit_prompt, created_by, if_current, Utc::now())
        })
    }

    pub fn revert(
        &mut self,
        page: &PageKey,
        target: u32,
        if_current: Option<u32>,
    ) -> PageResult<Option<PageVersion>> {
        self.write(|stores| history::revert(stores, page, target, if_current, Utc::now()))
    }

    pub fn restore_as_new(
        &mut self,
        page: &PageKey,
        target: u32,
        if_current: Option<u32>,
    ) -> PageResult<Option<PageVersion>> {
        self.write(|stores| history::restore_as_new(stores, page, target, if_current, Utc::now()))
    }

    pub fn create_thread(
        &mut self,
        page: &PageKey,
        anchor: Option<TextAnchor>,
        author: &str,
        body: &str,
    ) -> PageResult<Option<AnnotationThread>> {
        self.write(|stores| {
            annotations::create_thread(stores, page, anchor, author, body, Utc::now())
        })
    }

    pub fn reply(
        &mut self,
        thread_id: Uuid,
        author: &str,
        body: &str,
    ) -> PageResult<Option<ThreadMessage>> {
        self.write(|stores| annotations::reply(stores, thread_id, author, body, Utc::now()))
    }

    pub fn set_status(
        &mut self,
        thread_id: Uuid,
        status: ThreadStatus,
        if_version: Option<u32>,
    ) -> PageResult<Option<AnnotationThread>> {
        self.write(|stores| {
            annotations::set_status(stores, thread_id, status, if_version, Utc::now())
        })
    }

    // ── Reads ───────────────────────────────────────────────────────

    /// Stored history, or an unsaved version 1 for a page with content only.
    pub fn history(&self, page: &PageKey) -> PageResult<Option<PageVersionHistory>> {
        history::load(&self.stores(), page, Utc::now())
    }

    pub fn visible_history(&self, page: &PageKey) -> PageResult<Vec<PageVersion>> {
        history::visible_history(&self.stores(), page, Utc::now())
    }

    pub fn full_history(&self, page: &PageKey) -> PageResult<Vec<PageVersion>> {
        history::full_history(&self.stores(), page, Utc::now())
    }

    pub fn get_version(&self, page: &PageKey, version: u32) -> PageResult<Option<PageVersion>> {
        history::get_version(&self.stores(), page, version, Utc::now())
    }

    pub fn current_content(&self, page: &PageKey) -> PageResult<Option<String>> {
        Ok(self.stores().read_content(page)?)
    }

    pub fn thread(&self, thread_id: Uuid) -> PageResult<Option<AnnotationThread>> {
        Ok(self.stores().load_thread(thread_id)?)
    }

    pub fn list_threads(&self, page: &PageKey) -> PageResult<Vec<AnnotationThread>> {
        annotations::list_threads(&self.stores(), page)
    }

    /// Highlight every inline thread of `page` in its rendered `html`.
    pub fn annotate(&self, page: &PageKey, html: &str) -> PageResult<Injection> {
        annotations::annotate(&self.stores(), page, html, &self.highlight)
    }

    /// Build an anchor for the first occurrence of `text` in the visible text
    /// of `html`, with the configured amount of context. Falls back to a
    /// context-free anchor when `text` does not occur.
    pub fn capture_anchor(&self, html: &str, text: &str) -> PageResult<TextAnchor> {
        let projection = TextProjection::from_html(html);
        let visible = projection.text();
        let anchor = match visible.find(text) {
            Some(start) => {
                TextAnchor::capture(visible, start..start + text.len(), self.context_chars)?
            }
            None => TextAnchor::new(text, "", "")?,
        };
        Ok(anchor)
    }

    fn stores(&self) -> TxStores<'_> {
        TxStores::new(self.db.connection())
    }

    fn write<T>(&mut self, op: impl FnOnce(&TxStores<'_>) -> PageResult<T>) -> PageResult<T> {
        let tx = self
            .db
            .connection_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("failed to begin page transaction")?;
        let value = op(&TxStores::new(&tx))?;
        tx.commit().context("failed to commit page transaction")?;
        Ok(value)
    }
}
