// Version history operations over any storage backend.
//
// Each operation is a read-modify-write of the whole history record; callers
// that share a backend across writers must run it inside one transaction.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use quillwiki_common::history::{PageVersion, PageVersionHistory, VersionOrigin, VersionStatus};
use quillwiki_common::key::PageKey;

use crate::error::{PageError, PageResult};
use crate::store::{ContentStore, VersionStore};

/// Load the stored history, or build version 1 from existing content
/// without persisting it. `None` when the page is unknown.
pub fn load<S>(
    store: &S,
    page: &PageKey,
    now: DateTime<Utc>,
) -> PageResult<Option<PageVersionHistory>>
where
    S: VersionStore + ContentStore,
{
    if let Some(history) = store.load_history(page).map_err(classify)? {
        return Ok(Some(history));
    }
    synthesized(store, page, now)
}

/// Persist version 1 for a page that has none yet. Idempotent.
pub fn ensure_history<S>(
    store: &S,
    page: &PageKey,
    now: DateTime<Utc>,
) -> PageResult<PageVersionHistory>
where
    S: VersionStore + ContentStore,
{
    if let Some(history) = store.load_history(page).map_err(classify)? {
        return Ok(history);
    }

    let history = synthesized(store, page, now)?
        .unwrap_or_else(|| PageVersionHistory::initial(String::new(), now));
    store.save_history(page, &history).map_err(classify)?;
    info!(page = %page, "synthesized initial page version");
    Ok(history)
}

/// Append `content` as the next version and make it current.
pub fn commit<S>(
    store: &S,
    page: &PageKey,
    content: &str,
    edit_prompt: Option<String>,
    created_by: VersionOrigin,
    if_current: Option<u32>,
    now: DateTime<Utc>,
) -> PageResult<PageVersion>
where
    S: VersionStore + ContentStore,
{
    let mut history = ensure_history(store, page, now)?;
    check_pointer(page, &history, if_current)?;

    let superseding = history.pending_supersession();
    let committed = history.commit(content, edit_prompt, created_by, now).clone();
    store.save_history(page, &history).map_err(classify)?;
    info!(
        page = %page,
        version = committed.version,
        origin = created_by.as_str(),
        superseding,
        "committed page version"
    );
    Ok(committed)
}

/// Move the pointer back (or forward) to `target`. `Ok(None)` when the
/// version does not exist; nothing is written in that case.
pub fn revert<S>(
    store: &S,
    page: &PageKey,
    target: u32,
    if_current: Option<u32>,
    now: DateTime<Utc>,
) -> PageResult<Option<PageVersion>>
where
    S: VersionStore + ContentStore,
{
    let Some(mut history) = mutable_history(store, page, now)? else {
        return Ok(None);
    };
    check_pointer(page, &history, if_current)?;

    let Some(restored) = history.revert(target).cloned() else {
        warn!(page = %page, target, "revert target does not exist");
        return Ok(None);
    };
    store.save_history(page, &history).map_err(classify)?;
    info!(page = %page, version = target, "reverted page");
    Ok(Some(restored))
}

/// Copy `target`'s content into a new version. `Ok(None)` when the version
/// does not exist.
pub fn restore_as_new<S>(
    store: &S,
    page: &PageKey,
    target: u32,
    if_current: Option<u32>,
    now: DateTime<Utc>,
) -> PageResult<Option<PageVersion>>
where
    S: VersionStore + ContentStore,
{
    let Some(mut history) = mutable_history(store, page, now)? else {
        return Ok(None);
    };
    check_pointer(page, &history, if_current)?;

    let Some(restored) = history.restore_as_new(target, now).cloned() else {
        warn!(page = %page, target, "restore target does not exist");
        return Ok(None);
    };
    store.save_history(page, &history).map_err(classify)?;
    info!(
        page = %page,
        version = restored.version,
        from = target,
        "restored page as new version"
    );
    Ok(Some(restored))
}

pub fn visible_history<S>(
    store: &S,
    page: &PageKey,
    now: DateTime<Utc>,
) -> PageResult<Vec<PageVersion>>
where
    S: VersionStore + ContentStore,
{
    Ok(load(store, page, now)?
        .map(|history| history.visible().into_iter().cloned().collect())
        .unwrap_or_default())
}

pub fn full_history<S>(
    store: &S,
    page: &PageKey,
    now: DateTime<Utc>,
) -> PageResult<Vec<PageVersion>>
where
    S: VersionStore + ContentStore,
{
    Ok(load(store, page, now)?
        .map(|history| history.all().into_iter().cloned().collect())
        .unwrap_or_default())
}

pub fn get_version<S>(
    store: &S,
    page: &PageKey,
    version: u32,
    now: DateTime<Utc>,
) -> PageResult<Option<PageVersion>>
where
    S: VersionStore + ContentStore,
{
    Ok(load(store, page, now)?.and_then(|history| history.get(version).cloned()))
}

/// One row of a history listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub version: u32,
    pub status: VersionStatus,
    pub created_by: VersionOrigin,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverted_from: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superseded_at: Option<DateTime<Utc>>,
    pub content_chars: usize,
}

/// History listing with badges, newest first. Without `include_all` only the
/// visible versions are listed.
pub fn listing(history: &PageVersionHistory, include_all: bool) -> Vec<HistoryEntry> {
    let versions = if include_all { history.all() } else { history.visible() };
    versions
        .into_iter()
        .map(|version| HistoryEntry {
            version: version.version,
            status: history.status_of(version),
            created_by: version.created_by,
            created_at: version.created_at,
            edit_prompt: version.edit_prompt.clone(),
            reverted_from: version.reverted_from,
            superseded_at: version.superseded_at,
            content_chars: version.content.chars().count(),
        })
        .collect()
}

/// Version 1 built from live content, dated by the content's last write so
/// repeated reads agree. `None` when the page has no content.
fn synthesized<S>(
    store: &S,
    page: &PageKey,
    now: DateTime<Utc>,
) -> PageResult<Option<PageVersionHistory>>
where
    S: ContentStore,
{
    let Some(content) = store.read_content(page).map_err(classify)? else {
        return Ok(None);
    };
    let written = store.content_updated_at(page).map_err(classify)?.unwrap_or(now);
    Ok(Some(PageVersionHistory::initial(content, written)))
}

/// History to mutate, persisting version 1 first when needed. `None` for an
/// unknown page so that a miss writes nothing.
fn mutable_history<S>(
    store: &S,
    page: &PageKey,
    now: DateTime<Utc>,
) -> PageResult<Option<PageVersionHistory>>
where
    S: VersionStore + ContentStore,
{
    if store.load_history(page).map_err(classify)?.is_none()
        && store.read_content(page).map_err(classify)?.is_none()
    {
        return Ok(None);
    }
    ensure_history(store, page, now).map(Some)
}

fn check_pointer(
    page: &PageKey,
    history: &PageVersionHistory,
    if_current: Option<u32>,
) -> PageResult<()> {
    let actual = history.current_version();
    match if_current {
        Some(expected) if expected != actual => {
            warn!(page = %page, expected, actual, "rejected stale page write");
            Err(PageError::PreconditionFailed { resource: "page", expected, actual })
        }
        _ => Ok(()),
    }
}

/// Surface history corruption as its own error kind.
pub(crate) fn classify(error: anyhow::Error) -> PageError {
    match error.downcast::<quillwiki_common::history::HistoryError>() {
        Ok(corrupt) => PageError::Corrupt(corrupt),
        Err(error) => PageError::Storage(error),
    }
}
