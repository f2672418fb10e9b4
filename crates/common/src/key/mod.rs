// Opaque page identity shared by version history and comment threads.

mod normalize;
mod slug;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use normalize::{normalize_segment, KeyError, MAX_SEGMENT_CHARS};
pub use slug::slugify;

/// Identity of one wiki page: the project it lives in plus its slug.
///
/// Both segments are normalized on construction; see [`normalize_segment`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageKey {
    project: String,
    slug: String,
}

impl PageKey {
    pub fn new(project: &str, slug: &str) -> Result<Self, KeyError> {
        Ok(Self {
            project: normalize_segment("project", project)?,
            slug: normalize_segment("slug", slug)?,
        })
    }

    /// Build a key from a human title, slugifying it first.
    pub fn from_title(project: &str, title: &str) -> Result<Self, KeyError> {
        Self::new(project, &slugify(title))
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project, self.slug)
    }
}
