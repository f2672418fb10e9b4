// Outcomes of page operations that callers are expected to match on.

use quillwiki_common::anchor::AnchorError;
use quillwiki_common::history::HistoryError;
use quillwiki_common::key::KeyError;
use quillwiki_common::types::ThreadError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PageError {
    #[error("invalid page key: {0}")]
    InvalidKey(#[from] KeyError),

    #[error("invalid anchor: {0}")]
    InvalidAnchor(#[from] AnchorError),

    #[error("invalid comment: {0}")]
    InvalidThread(#[from] ThreadError),

    #[error("{resource} precondition failed: expected {expected}, found {actual}")]
    PreconditionFailed { resource: &'static str, expected: u32, actual: u32 },

    #[error("corrupt page history: {0}")]
    Corrupt(#[from] HistoryError),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl PageError {
    /// Rejected caller input, as opposed to a conflict or storage failure.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidKey(_) | Self::InvalidAnchor(_) | Self::InvalidThread(_))
    }
}

pub type PageResult<T> = Result<T, PageError>;
