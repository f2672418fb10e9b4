// Comment threads attached to wiki pages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::anchor::TextAnchor;
use crate::key::PageKey;

/// Maximum comment body length in characters.
pub const MAX_BODY_CHARS: usize = 10_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ThreadError {
    #[error("comment body must not be empty")]
    EmptyBody,

    #[error("comment body exceeds maximum length of {MAX_BODY_CHARS} characters")]
    BodyTooLong,

    #[error("comment author must not be empty")]
    EmptyAuthor,

    #[error("thread must be {required} to become {requested}")]
    InvalidTransition { required: ThreadStatus, requested: ThreadStatus },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ThreadStatus {
    Open,
    Resolved,
}

impl ThreadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Resolved => "resolved",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "open" => Some(Self::Open),
            "resolved" => Some(Self::Resolved),
            _ => None,
        }
    }
}

impl std::fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message within a thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThreadMessage {
    pub id: Uuid,
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// A discussion owned by a page. Inline threads carry an anchor; page-level
/// threads do not.
///
/// Threads outlive page versions and are never deleted when their anchor
/// stops resolving; they are reported as orphaned at render time instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnnotationThread {
    pub id: Uuid,
    pub page: PageKey,
    pub anchor: Option<TextAnchor>,
    pub status: ThreadStatus,
    /// Bumped on every status change; used for `if_version` preconditions.
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub messages: Vec<ThreadMessage>,
}

impl AnnotationThread {
    /// Start a thread with its first message.
    pub fn new(
        page: PageKey,
        anchor: Option<TextAnchor>,
        author: &str,
        body: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, ThreadError> {
        let first = new_message(author, body, now)?;
        Ok(Self {
            id: Uuid::new_v4(),
            page,
            anchor,
            status: ThreadStatus::Open,
            version: 1,
            created_at: now,
            resolved_at: None,
            messages: vec![first],
        })
    }

    pub fn is_inline(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn reply(
        &mut self,
        author: &str,
        body: &str,
        now: DateTime<Utc>,
    ) -> Result<&ThreadMessage, ThreadError> {
        let message = new_message(author, body, now)?;
        self.messages.push(message);
        Ok(&self.messages[self.messages.len() - 1])
    }

    /// Resolve an open thread or reopen a resolved one.
    pub fn transition(
        &mut self,
        requested: ThreadStatus,
        now: DateTime<Utc>,
    ) -> Result<(), ThreadError> {
        let required = match requested {
            ThreadStatus::Resolved => ThreadStatus::Open,
            ThreadStatus::Open => ThreadStatus::Resolved,
        };
        if self.status != required {
            return Err(ThreadError::InvalidTransition { required, requested });
        }

        self.status = requested;
        self.resolved_at = (requested == ThreadStatus::Resolved).then_some(now);
        self.version = self.version.saturating_add(1);
        Ok(())
    }
}

fn new_message(
    author: &str,
    body: &str,
    now: DateTime<Utc>,
) -> Result<ThreadMessage, ThreadError> {
    let author = author.trim();
    if author.is_empty() {
        return Err(ThreadError::EmptyAuthor);
    }
    if body.trim().is_empty() {
        return Err(ThreadError::EmptyBody);
    }
    if body.chars().count() > MAX_BODY_CHARS {
        return Err(ThreadError::BodyTooLong);
    }
    Ok(ThreadMessage {
        id: Uuid::new_v4(),
        author: author.to_string(),
        body: body.to_string(),
        created_at: now,
    })
}
