// Comment thread operations and highlight rendering for a page.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use quillwiki_common::anchor::TextAnchor;
use quillwiki_common::highlight::{inject, HighlightOptions, HighlightTarget, Injection};
use quillwiki_common::key::PageKey;
use quillwiki_common::types::{AnnotationThread, ThreadMessage, ThreadStatus};

use crate::error::{PageError, PageResult};
use crate::history::classify;
use crate::store::{CommentStore, ContentStore, VersionStore};

/// Open a thread on a page. `Ok(None)` when the page is unknown.
pub fn create_thread<S>(
    store: &S,
    page: &PageKey,
    anchor: Option<TextAnchor>,
    author: &str,
    body: &str,
    now: DateTime<Utc>,
) -> PageResult<Option<AnnotationThread>>
where
    S: CommentStore + ContentStore + VersionStore,
{
    if !page_exists(store, page)? {
        return Ok(None);
    }

    let thread = AnnotationThread::new(page.clone(), anchor, author, body, now)?;
    store.save_thread(&thread).map_err(classify)?;
    debug!(
        page = %page,
        thread = %thread.id,
        inline = thread.is_inline(),
        "opened comment thread"
    );
    Ok(Some(thread))
}

pub fn reply<S>(
    store: &S,
    thread_id: Uuid,
    author: &str,
    body: &str,
    now: DateTime<Utc>,
) -> PageResult<Option<ThreadMessage>>
where
    S: CommentStore,
{
    let Some(mut thread) = store.load_thread(thread_id).map_err(classify)? else {
        return Ok(None);
    };
    let message = thread.reply(author, body, now)?.clone();
    store.save_thread(&thread).map_err(classify)?;
    debug!(thread = %thread_id, "replied to comment thread");
    Ok(Some(message))
}

/// Resolve or reopen a thread. With `if_version` the change only applies if
/// the stored thread version still matches.
pub fn set_status<S>(
    store: &S,
    thread_id: Uuid,
    status: ThreadStatus,
    if_version: Option<u32>,
    now: DateTime<Utc>,
) -> PageResult<Option<AnnotationThread>>
where
    S: CommentStore,
{
    let Some(mut thread) = store.load_thread(thread_id).map_err(classify)? else {
        return Ok(None);
    };
    if let Some(expected) = if_version.filter(|expected| *expected != thread.version) {
        warn!(
            thread = %thread_id,
            expected,
            actual = thread.version,
            "rejected stale thread update"
        );
        return Err(PageError::PreconditionFailed {
            resource: "thread",
            expected,
            actual: thread.version,
        });
    }

    thread.transition(status, now)?;
    store.save_thread(&thread).map_err(classify)?;
    debug!(thread = %thread_id, status = status.as_str(), "updated comment thread status");
    Ok(Some(thread))
}

pub fn list_threads<S>(store: &S, page: &PageKey) -> PageResult<Vec<AnnotationThread>>
where
    S: CommentStore,
{
    store.list_threads(page).map_err(classify)
}

/// Inject highlight markers for every inline thread of `page` into its
/// rendered `html`. Page-level threads are skipped.
pub fn annotate<S>(
    store: &S,
    page: &PageKey,
    html: &str,
    options: &HighlightOptions,
) -> PageResult<Injection>
where
    S: CommentStore,
{
    let threads = store.list_threads(page).map_err(classify)?;
    Ok(annotate_threads(page, html, &threads, options))
}

pub fn annotate_threads(
    page: &PageKey,
    html: &str,
    threads: &[AnnotationThread],
    options: &HighlightOptions,
) -> Injection {
    let ids: Vec<String> = threads.iter().map(|thread| thread.id.to_string()).collect();
    let targets: Vec<HighlightTarget<'_>> = threads
        .iter()
        .zip(&ids)
        .filter_map(|(thread, id)| {
            thread.anchor.as_ref().map(|anchor| HighlightTarget {
                id,
                anchor,
                resolved: thread.status == ThreadStatus::Resolved,
            })
        })
        .collect();

    let injection = inject(html, &targets, options);
    for id in &injection.orphaned_ids {
        warn!(page = %page, thread = %id, "comment anchor no longer resolves");
    }
    debug!(
        page = %page,
        marked = targets.len() - injection.orphaned_ids.len(),
        orphaned = injection.orphaned_ids.len(),
        "injected comment highlights"
    );
    injection
}

fn page_exists<S>(store: &S, page: &PageKey) -> PageResult<bool>
where
    S: ContentStore + VersionStore,
{
    if store.read_content(page).map_err(classify)?.is_some() {
        return Ok(true);
    }
    Ok(store.load_history(page).map_err(classify)?.is_some())
}
