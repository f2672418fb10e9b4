// Persistence seams: page content, version history and comment threads.

pub mod memory;
pub mod meta_db;
pub mod pages;
pub mod threads;

use anyhow::Result;
use chrono::{DateTime, Utc};
use quillwiki_common::history::PageVersionHistory;
use quillwiki_common::key::PageKey;
use quillwiki_common::types::AnnotationThread;
use uuid::Uuid;

/// Live page content as seen by readers.
pub trait ContentStore {
    /// `None` when nothing was ever written for the page.
    fn read_content(&self, page: &PageKey) -> Result<Option<String>>;

    /// When live content was last written. `None` when the page is unknown.
    fn content_updated_at(&self, page: &PageKey) -> Result<Option<DateTime<Utc>>>;

    /// Overwrite live content without touching version history.
    fn write_content(&self, page: &PageKey, content: &str) -> Result<()>;
}

pub trait VersionStore {
    /// `None` when the page has no stored versions yet.
    fn load_history(&self, page: &PageKey) -> Result<Option<PageVersionHistory>>;

    /// Persist every version plus the pointer, and set live content to the
    /// current version's content.
    fn save_history(&self, page: &PageKey, history: &PageVersionHistory) -> Result<()>;
}

pub trait CommentStore {
    fn load_thread(&self, id: Uuid) -> Result<Option<AnnotationThread>>;

    /// Threads of one page, oldest first.
    fn list_threads(&self, page: &PageKey) -> Result<Vec<AnnotationThread>>;

    /// Insert or update the thread and any messages not stored yet.
    fn save_thread(&self, thread: &AnnotationThread) -> Result<()>;
}
