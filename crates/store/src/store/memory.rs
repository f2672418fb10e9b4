// In-memory implementation of the storage traits.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use quillwiki_common::history::PageVersionHistory;
use quillwiki_common::key::PageKey;
use quillwiki_common::types::AnnotationThread;

use super::{CommentStore, ContentStore, VersionStore};

#[derive(Debug, Default)]
pub struct MemoryPageStore {
    content: Mutex<HashMap<PageKey, (String, DateTime<Utc>)>>,
    histories: Mutex<HashMap<PageKey, PageVersionHistory>>,
    threads: Mutex<Vec<AnnotationThread>>,
}

impl MemoryPageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("memory page store lock poisoned")
}

impl ContentStore for MemoryPageStore {
    fn read_content(&self, page: &PageKey) -> Result<Option<String>> {
        let content = self.content.lock().map_err(poisoned)?;
        Ok(content.get(page).map(|(text, _)| text.clone()))
    }

    fn content_updated_at(&self, page: &PageKey) -> Result<Option<DateTime<Utc>>> {
        Ok(self.content.lock().map_err(poisoned)?.get(page).map(|(_, at)| *at))
    }

    fn write_content(&self, page: &PageKey, content: &str) -> Result<()> {
        let mut stored = self.content.lock().map_err(poisoned)?;
        stored.insert(page.clone(), (content.to_string(), Utc::now()));
        Ok(())
    }
}

impl VersionStore for MemoryPageStore {
    fn load_history(&self, page: &PageKey) -> Result<Option<PageVersionHistory>> {
        Ok(self.histories.lock().map_err(poisoned)?.get(page).cloned())
    }

    fn save_history(&self, page: &PageKey, history: &PageVersionHistory) -> Result<()> {
        self.histories.lock().map_err(poisoned)?.insert(page.clone(), history.clone());
        self.write_content(page, &history.current().content)
    }
}

impl CommentStore for MemoryPageStore {
    fn load_thread(&self, id: Uuid) -> Result<Option<AnnotationThread>> {
        let threads = self.threads.lock().map_err(poisoned)?;
        Ok(threads.iter().find(|thread| thread.id == id).cloned())
    }

    fn list_threads(&self, page: &PageKey) -> Result<Vec<AnnotationThread>> {
        let threads = self.threads.lock().map_err(poisoned)?;
        Ok(threads.iter().filter(|thread| &thread.page == page).cloned().collect())
    }

    fn save_thread(&self, thread: &AnnotationThread) -> Result<()> {
        let mut threads = self.threads.lock().map_err(poisoned)?;
        match threads.iter_mut().find(|stored| stored.id == thread.id) {
            Some(stored) => *stored = thread.clone(),
            None => threads.push(thread.clone()),
        }
        Ok(())
    }
}
