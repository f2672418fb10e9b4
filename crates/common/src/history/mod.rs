// Per-page version history: an append-only list of full snapshots plus a
// movable current pointer.
//
// - commit appends `len + 1` and supersedes every non-superseded version
//   above the pointer
// - revert only moves the pointer (and reactivates a superseded target)
// - supersession never happens at revert time, only at the next commit

mod hash;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use hash::sha256_hex;

/// What produced a version.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VersionOrigin {
    Generation,
    Edit,
    Revert,
}

impl VersionOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generation => "generation",
            Self::Edit => "edit",
            Self::Revert => "revert",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "generation" => Some(Self::Generation),
            "edit" => Some(Self::Edit),
            "revert" => Some(Self::Revert),
            _ => None,
        }
    }
}

/// One immutable content snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageVersion {
    /// 1-based, contiguous, never reused.
    pub version: u32,
    pub content: String,
    /// Instruction that produced this version; `None` for the initial generation.
    pub edit_prompt: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: VersionOrigin,
    /// Source version when this entry was forked from an older one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverted_from: Option<u32>,
    /// Set when a later commit abandoned this version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superseded_at: Option<DateTime<Utc>>,
}

impl PageVersion {
    pub fn is_superseded(&self) -> bool {
        self.superseded_at.is_some()
    }

    pub fn content_hash(&self) -> String {
        sha256_hex(self.content.as_bytes())
    }
}

/// Badge shown next to a version in history listings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    /// The pointer is here.
    Current,
    /// Below the pointer and still active.
    Past,
    /// Above the pointer after a revert, not yet abandoned by a commit.
    Future,
    /// Abandoned by a commit made while the pointer was behind the tip.
    Superseded,
}

/// Contract violations in a persisted history. These indicate a bug
/// upstream and are never repaired silently.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HistoryError {
    #[error("history has no versions")]
    Empty,

    #[error("version numbers must be contiguous from 1: expected {expected}, found {found}")]
    NonContiguous { expected: u32, found: u32 },

    #[error("current pointer {0} does not refer to a stored version")]
    DanglingPointer(u32),

    #[error("stored content hash does not match content of version {0}")]
    HashMismatch(u32),
}

/// All versions of one page plus the pointer to its live content.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PageVersionHistory {
    versions: Vec<PageVersion>,
    current: u32,
}

impl PageVersionHistory {
    /// History for a page that had no versions yet: version 1 is synthesized
    /// from whatever content already exists.
    pub fn initial(existing_content: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            versions: vec![PageVersion {
                version: 1,
                content: existing_content.into(),
                edit_prompt: None,
                created_at: now,
                created_by: VersionOrigin::Generation,
                reverted_from: None,
                superseded_at: None,
            }],
            current: 1,
        }
    }

    /// Rebuild a history from persisted rows, checking every structural
    /// invariant.
    pub fn from_parts(versions: Vec<PageVersion>, current: u32) -> Result<Self, HistoryError> {
        if versions.is_empty() {
            return Err(HistoryError::Empty);
        }
        for (index, version) in versions.iter().enumerate() {
            let expected = index as u32 + 1;
            if version.version != expected {
                return Err(HistoryError::NonContiguous { expected, found: version.version });
            }
        }
        if current == 0 || current as usize > versions.len() {
            return Err(HistoryError::DanglingPointer(current));
        }
        Ok(Self { versions, current })
    }

    /// Append a new version and move the pointer to it.
    ///
    /// Versions above the old pointer that are still active get
    /// `superseded_at = now` first.
    pub fn commit(
        &mut self,
        content: impl Into<String>,
        edit_prompt: Option<String>,
        created_by: VersionOrigin,
        now: DateTime<Utc>,
    ) -> &PageVersion {
        self.push(content.into(), edit_prompt, created_by, None, now)
    }

    /// Fork an existing version's content into a brand-new version.
    ///
    /// Returns `None` when `target` does not exist.
    pub fn restore_as_new(&mut self, target: u32, now: DateTime<Utc>) -> Option<&PageVersion> {
        let content = self.get(target)?.content.clone();
        Some(self.push(content, None, VersionOrigin::Revert, Some(target), now))
    }

    /// Move the pointer to `target`, reactivating it if it was superseded.
    ///
    /// Never appends. Returns `None` when `target` does not exist.
    pub fn revert(&mut self, target: u32) -> Option<&PageVersion> {
        let index = self.index_of(target)?;
        let version = &mut self.versions[index];
        version.superseded_at = None;
        self.current = target;
        Some(&self.versions[index])
    }

    /// Versions at or below the pointer that are not superseded, newest first.
    pub fn visible(&self) -> Vec<&PageVersion> {
        self.versions
            .iter()
            .rev()
            .filter(|version| version.version <= self.current && !version.is_superseded())
            .collect()
    }

    /// Every version regardless of pointer or supersession, newest first.
    pub fn all(&self) -> Vec<&PageVersion> {
        self.versions.iter().rev().collect()
    }

    pub fn get(&self, version: u32) -> Option<&PageVersion> {
        self.index_of(version).map(|index| &self.versions[index])
    }

    pub fn current(&self) -> &PageVersion {
        &self.versions[self.current as usize - 1]
    }

    pub fn current_version(&self) -> u32 {
        self.current
    }

    pub fn latest_version(&self) -> u32 {
        self.versions.len() as u32
    }

    pub fn versions(&self) -> &[PageVersion] {
        &self.versions
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Versions above the pointer that the next commit would supersede.
    pub fn pending_supersession(&self) -> usize {
        self.versions
            .iter()
            .filter(|version| version.version > self.current && !version.is_superseded())
            .count()
    }

    pub fn status_of(&self, version: &PageVersion) -> VersionStatus {
        if version.version == self.current {
            VersionStatus::Current
        } else if version.is_superseded() {
            VersionStatus::Superseded
        } else if version.version > self.current {
            VersionStatus::Future
        } else {
            VersionStatus::Past
        }
    }

    fn index_of(&self, version: u32) -> Option<usize> {
        let index = (version as usize).checked_sub(1)?;
        (index < self.versions.len()).then_some(index)
    }

    fn push(
        &mut self,
        content: String,
        edit_prompt: Option<String>,
        created_by: VersionOrigin,
        reverted_from: Option<u32>,
        now: DateTime<Utc>,
    ) -> &PageVersion {
        let current = self.current;
        for version in self.versions.iter_mut().filter(|v| v.version > current) {
            if version.superseded_at.is_none() {
                version.superseded_at = Some(now);
            }
        }

        let next = self.latest_version() + 1;
        self.versions.push(PageVersion {
            version: next,
            content,
            edit_prompt,
            created_at: now,
            created_by,
            reverted_from,
            superseded_at: None,
        });
        self.current = next;
        &self.versions[next as usize - 1]
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn t(minute: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + minute * 60, 0)
            .single()
            .expect("timestamp should be representable")
    }

    fn numbers(versions: &[&PageVersion]) -> Vec<u32> {
        versions.iter().map(|version| version.version).collect()
    }

    /// v1 generation, v2..=v4 edits, pointer at 4.
    fn four_versions() -> PageVersionHistory {
        let mut history = PageVersionHistory::initial("v1", t(0));
        history.commit("v2", Some("expand intro".into()), VersionOrigin::Edit, t(1));
        history.commit("v3", Some("add examples".into()), VersionOrigin::Edit, t(2));
        history.commit("v4", Some("fix typos".into()), VersionOrigin::Edit, t(3));
        history
    }

    #[test]
    fn initial_history_has_single_generation_version() {
        let history = PageVersionHistory::initial("", t(0));
        assert_eq!(history.len(), 1);
        assert_eq!(history.current_version(), 1);
        assert_eq!(history.current().created_by, VersionOrigin::Generation);
        assert!(history.current().edit_prompt.is_none());
        assert_eq!(history.current().content, "");
    }

    #[test]
    fn commit_allocates_next_number_and_moves_pointer() {
        let mut history = PageVersionHistory::initial("a", t(0));
        let committed = history.commit("b", Some("more".into()), VersionOrigin::Edit, t(1));
        assert_eq!(committed.version, 2);
        assert_eq!(committed.edit_prompt.as_deref(), Some("more"));
        assert_eq!(history.current_version(), 2);
        assert_eq!(history.current().content, "b");
    }

    #[test]
    fn revert_moves_pointer_without_appending() {
        let mut history = four_versions();
        let restored = history.revert(2).expect("version 2 exists");
        assert_eq!(restored.content, "v2");
        assert_eq!(history.len(), 4);
        assert_eq!(history.current_version(), 2);
    }

    #[test]
    fn pending_supersession_skips_already_superseded_versions() {
        let mut history = four_versions();
        assert_eq!(history.pending_supersession(), 0);

        history.revert(2).unwrap();
        assert_eq!(history.pending_supersession(), 2);
        history.commit("v5", None, VersionOrigin::Edit, t(4));
        assert_eq!(history.pending_supersession(), 0);

        history.revert(1).unwrap();
        assert_eq!(history.latest_version() - history.current_version(), 4);
        assert_eq!(history.pending_supersession(), 2);
    }

    #[test]
    fn revert_alone_leaves_future_versions_unsuperseded() {
        let mut history = four_versions();
        history.revert(2).unwrap();

        assert!(history.versions().iter().all(|version| !version.is_superseded()));
        assert_eq!(history.status_of(history.get(3).unwrap()), VersionStatus::Future);
        assert_eq!(history.status_of(history.get(2).unwrap()), VersionStatus::Current);
        assert_eq!(history.status_of(history.get(1).unwrap()), VersionStatus::Past);
    }

    #[test]
    fn commit_after_revert_supersedes_abandoned_future() {
        let mut history = four_versions();
        history.revert(2).unwrap();
        let committed = history.commit("v5", Some("rewrite".into()), VersionOrigin::Edit, t(10));

        assert_eq!(committed.version, 5);
        assert_eq!(history.get(3).unwrap().superseded_at, Some(t(10)));
        assert_eq!(history.get(4).unwrap().superseded_at, Some(t(10)));
        assert!(!history.get(2).unwrap().is_superseded());
        assert_eq!(numbers(&history.visible()), vec![5, 2, 1]);
        assert_eq!(numbers(&history.all()), vec![5, 4, 3, 2, 1]);
    }

    #[test]
    fn commit_keeps_original_supersession_timestamp() {
        let mut history = four_versions();
        history.revert(2).unwrap();
        history.commit("v5", None, VersionOrigin::Edit, t(10));
        history.revert(1).unwrap();
        history.commit("v6", None, VersionOrigin::Edit, t(20));

        assert_eq!(history.get(3).unwrap().superseded_at, Some(t(10)));
        assert_eq!(history.get(2).unwrap().superseded_at, Some(t(20)));
        assert_eq!(history.get(5).unwrap().superseded_at, Some(t(20)));
        assert_eq!(numbers(&history.visible()), vec![6, 1]);
    }

    #[test]
    fn revert_to_superseded_version_reactivates_only_target() {
        let mut history = four_versions();
        history.revert(2).unwrap();
        history.commit("v5", None, VersionOrigin::Edit, t(10));

        let restored = history.revert(4).expect("superseded versions stay restorable");
        assert!(restored.superseded_at.is_none());
        assert_eq!(history.current_version(), 4);
        assert_eq!(history.get(3).unwrap().superseded_at, Some(t(10)));
        assert!(!history.get(5).unwrap().is_superseded());
        assert_eq!(numbers(&history.visible()), vec![4, 2, 1]);
    }

    #[test]
    fn revert_to_missing_version_is_a_miss_without_mutation() {
        let mut history = four_versions();
        let before = history.clone();
        assert!(history.revert(0).is_none());
        assert!(history.revert(9).is_none());
        assert_eq!(history, before);
    }

    #[test]
    fn get_ignores_pointer_and_supersession() {
        let mut history = four_versions();
        history.revert(1).unwrap();
        history.commit("v5", None, VersionOrigin::Edit, t(5));
        assert_eq!(history.get(3).unwrap().content, "v3");
        assert!(history.get(6).is_none());
        assert!(history.get(0).is_none());
    }

    #[test]
    fn restore_as_new_forks_content_into_new_version() {
        let mut history = four_versions();
        let restored = history.restore_as_new(2, t(7)).expect("version 2 exists");
        assert_eq!(restored.version, 5);
        assert_eq!(restored.content, "v2");
        assert_eq!(restored.created_by, VersionOrigin::Revert);
        assert_eq!(restored.reverted_from, Some(2));
        assert_eq!(history.current_version(), 5);
        assert!(history.restore_as_new(42, t(8)).is_none());
        assert_eq!(history.len(), 5);
    }

    #[test]
    fn versions_stay_contiguous_across_mixed_operations() {
        let mut history = four_versions();
        history.revert(1).unwrap();
        history.commit("x", None, VersionOrigin::Edit, t(4));
        history.revert(3).unwrap();
        history.restore_as_new(5, t(5)).unwrap();
        history.commit("y", None, VersionOrigin::Edit, t(6));

        for (index, version) in history.versions().iter().enumerate() {
            assert_eq!(version.version, index as u32 + 1);
        }
        assert_eq!(history.current_version(), history.latest_version());
    }

    #[test]
    fn visible_never_shows_superseded_or_future_versions() {
        let mut history = four_versions();
        history.revert(2).unwrap();
        assert_eq!(numbers(&history.visible()), vec![2, 1]);
        history.commit("v5", None, VersionOrigin::Edit, t(9));
        for version in history.visible() {
            assert!(version.version <= history.current_version());
            assert!(!version.is_superseded());
        }
    }

    #[test]
    fn from_parts_validates_structure() {
        let history = four_versions();
        let versions = history.versions().to_vec();

        assert_eq!(PageVersionHistory::from_parts(Vec::new(), 1), Err(HistoryError::Empty));
        assert_eq!(
            PageVersionHistory::from_parts(versions.clone(), 5),
            Err(HistoryError::DanglingPointer(5))
        );

        let mut duplicated = versions.clone();
        duplicated[2].version = 2;
        assert_eq!(
            PageVersionHistory::from_parts(duplicated, 1),
            Err(HistoryError::NonContiguous { expected: 3, found: 2 })
        );

        let rebuilt = PageVersionHistory::from_parts(versions, 4).expect("valid history");
        assert_eq!(rebuilt, history);
    }

    #[test]
    fn origin_round_trips_through_storage_names() {
        for origin in [VersionOrigin::Generation, VersionOrigin::Edit, VersionOrigin::Revert] {
            assert_eq!(VersionOrigin::parse(origin.as_str()), Some(origin));
        }
        assert_eq!(VersionOrigin::parse("fork"), None);
    }
}
