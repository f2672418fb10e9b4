// Text anchors: capture a selection with a little surrounding context, then
// re-locate it in content that may have changed since.
//
// Resolution tries an ordered list of exact-match strategies. There is no
// fuzzy matching: an anchor that no strategy finds is orphaned.

mod projection;

use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use projection::TextProjection;

/// Characters of context captured on each side of a selection.
pub const DEFAULT_CONTEXT_CHARS: usize = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnchorError {
    #[error("anchor text must not be empty")]
    EmptyText,

    #[error("selection {start}..{end} is not a valid range in a {len}-byte source")]
    InvalidRange { start: usize, end: usize, len: usize },
}

/// A selected fragment plus the text immediately around it at capture time.
///
/// None of the parts are authoritative once content changes; they are hints
/// for [`resolve`] and [`resolve_html`]. `text` is never blank, including
/// after deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "RawAnchor")]
pub struct TextAnchor {
    text: String,
    prefix: String,
    suffix: String,
}

#[derive(Deserialize)]
struct RawAnchor {
    text: String,
    #[serde(default)]
    prefix: String,
    #[serde(default)]
    suffix: String,
}

impl TryFrom<RawAnchor> for TextAnchor {
    type Error = AnchorError;

    fn try_from(raw: RawAnchor) -> Result<Self, Self::Error> {
        Self::new(raw.text, raw.prefix, raw.suffix)
    }
}

impl TextAnchor {
    pub fn new(
        text: impl Into<String>,
        prefix: impl Into<String>,
        suffix: impl Into<String>,
    ) -> Result<Self, AnchorError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(AnchorError::EmptyText);
        }
        Ok(Self { text, prefix: prefix.into(), suffix: suffix.into() })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Capture the selection `range` (byte offsets) of `source`, keeping up to
    /// `context_chars` characters on each side.
    pub fn capture(
        source: &str,
        range: Range<usize>,
        context_chars: usize,
    ) -> Result<Self, AnchorError> {
        let invalid = AnchorError::InvalidRange {
            start: range.start,
            end: range.end,
            len: source.len(),
        };
        if range.start > range.end
            || range.end > source.len()
            || !source.is_char_boundary(range.start)
            || !source.is_char_boundary(range.end)
        {
            return Err(invalid);
        }

        let before = &source[..range.start];
        let prefix_start = match context_chars {
            0 => before.len(),
            n => before.char_indices().rev().nth(n - 1).map_or(0, |(offset, _)| offset),
        };
        let suffix: String = source[range.end..].chars().take(context_chars).collect();

        Self::new(&source[range.clone()], &before[prefix_start..], suffix)
    }
}

/// One way of searching for an anchor, from cheapest to most contextual.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// `text` alone.
    ExactText,
    /// `prefix + text + suffix`.
    ExactContext,
    /// `prefix + text`.
    PrefixContext,
    /// `text + suffix`.
    SuffixContext,
}

impl MatchStrategy {
    /// Evaluation order; the first strategy with a unique match wins.
    pub const ORDER: [Self; 4] =
        [Self::ExactText, Self::ExactContext, Self::PrefixContext, Self::SuffixContext];

    /// Preference among strategies that only matched ambiguously.
    const AMBIGUOUS_PREFERENCE: [Self; 4] =
        [Self::ExactContext, Self::PrefixContext, Self::SuffixContext, Self::ExactText];

    /// The string to search for and the offset of `anchor.text` inside it.
    fn needle(self, anchor: &TextAnchor) -> (String, usize) {
        let TextAnchor { text, prefix, suffix } = anchor;
        match self {
            Self::ExactText => (text.clone(), 0),
            Self::ExactContext => (format!("{prefix}{text}{suffix}"), prefix.len()),
            Self::PrefixContext => (format!("{prefix}{text}"), prefix.len()),
            Self::SuffixContext => (format!("{text}{suffix}"), 0),
        }
    }
}

/// Where an anchor was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Half-open byte span of the anchor text in the searched string.
    pub span: Range<usize>,
    pub strategy: MatchStrategy,
    /// No strategy matched exactly once; `span` is the first occurrence.
    pub ambiguous: bool,
}

/// Locate `anchor` in plain text.
///
/// Strategies run in [`MatchStrategy::ORDER`] and the first one whose needle
/// occurs exactly once wins. When every matching strategy is ambiguous the
/// first occurrence of the most contextual one is returned, flagged
/// `ambiguous`. Returns `None` when nothing matches.
pub fn resolve(haystack: &str, anchor: &TextAnchor) -> Option<Resolution> {
    if anchor.text.trim().is_empty() {
        return None;
    }

    let mut ambiguous = Vec::new();
    for strategy in MatchStrategy::ORDER {
        let (needle, text_offset) = strategy.needle(anchor);
        let Some(found) = locate(haystack, &needle) else {
            continue;
        };
        let start = found.start + text_offset;
        let span = start..start + anchor.text.len();
        if found.unique {
            return Some(Resolution { span, strategy, ambiguous: false });
        }
        ambiguous.push((strategy, span));
    }

    MatchStrategy::AMBIGUOUS_PREFERENCE.into_iter().find_map(|preferred| {
        ambiguous
            .iter()
            .find(|(strategy, _)| *strategy == preferred)
            .map(|(strategy, span)| Resolution {
                span: span.clone(),
                strategy: *strategy,
                ambiguous: true,
            })
    })
}

/// Locate `anchor` in rendered HTML.
///
/// Matching runs against the [`TextProjection`] so markup never takes part in
/// a match; the returned span is in HTML byte offsets and may cross tags.
pub fn resolve_html(html: &str, anchor: &TextAnchor) -> Option<Resolution> {
    let projection = TextProjection::from_html(html);
    let found = resolve(projection.text(), anchor)?;
    let span = projection.html_span(found.span)?;
    Some(Resolution { span, ..found })
}

struct Occurrence {
    start: usize,
    unique: bool,
}

fn locate(haystack: &str, needle: &str) -> Option<Occurrence> {
    let start = haystack.find(needle)?;
    let step = haystack[start..].chars().next().map_or(1, char::len_utf8);
    let unique = haystack[start + step..].find(needle).is_none();
    Some(Occurrence { start, unique })
}
