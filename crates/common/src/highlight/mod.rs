// Highlight injection: wrap every resolvable anchor of a rendered page in a
// marker element, collecting the ones that no longer resolve.
//
// Spans are applied right to left and each one is re-resolved against the
// document as it stands at that moment. Marker tags are invisible to the text
// projection, so re-resolution lands on the same characters with offsets that
// already account for every marker inserted so far.

mod balance;

use serde::Serialize;
use thiserror::Error;

use crate::anchor::{resolve_html, TextAnchor};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HighlightError {
    #[error("marker element `{0}` is not a tag name (ASCII letter, then letters, digits or `-`)")]
    InvalidElement(String),

    #[error("marker element `{0}` is a void element and cannot wrap text")]
    VoidElement(String),
}

/// How marker elements are rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HighlightOptions {
    element: String,
    class: String,
}

impl HighlightOptions {
    /// `element` is written into markup verbatim, so it must be a plain tag
    /// name that can hold content. `class` is escaped on output.
    pub fn new(
        element: impl Into<String>,
        class: impl Into<String>,
    ) -> Result<Self, HighlightError> {
        let element = element.into();
        let mut chars = element.chars();
        let tag_name = chars.next().is_some_and(|ch| ch.is_ascii_alphabetic())
            && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '-');
        if !tag_name {
            return Err(HighlightError::InvalidElement(element));
        }
        if balance::is_void(&element) {
            return Err(HighlightError::VoidElement(element));
        }
        Ok(Self { element, class: class.into() })
    }

    /// Element name, e.g. `mark`.
    pub fn element(&self) -> &str {
        &self.element
    }

    /// Base CSS class; a `{class}--open` or `{class}--resolved` modifier is appended.
    pub fn class(&self) -> &str {
        &self.class
    }
}

impl Default for HighlightOptions {
    fn default() -> Self {
        Self { element: "mark".into(), class: "comment-highlight".into() }
    }
}

/// What the injector needs to know about one inline annotation.
#[derive(Debug, Clone, Copy)]
pub struct HighlightTarget<'a> {
    pub id: &'a str,
    pub anchor: &'a TextAnchor,
    pub resolved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Injection {
    pub html: String,
    /// Ids whose anchors could not be found, in input order.
    pub orphaned_ids: Vec<String>,
}

/// Wrap each target's anchor in `html` with a marker element.
pub fn inject(
    html: &str,
    targets: &[HighlightTarget<'_>],
    options: &HighlightOptions,
) -> Injection {
    let mut orphaned_ids = Vec::new();
    let mut placed = Vec::with_capacity(targets.len());
    for (index, target) in targets.iter().enumerate() {
        match resolve_html(html, target.anchor) {
            Some(found) => placed.push((found.span.start, index)),
            None => orphaned_ids.push(target.id.to_string()),
        }
    }

    // Rightmost first. Among equal starts the later target is applied first,
    // so the earlier one ends up innermost.
    placed.sort_by(|a, b| b.cmp(a));

    let mut document = html.to_string();
    for (_, index) in placed {
        let target = &targets[index];
        let Some(found) = resolve_html(&document, target.anchor) else {
            orphaned_ids.push(target.id.to_string());
            continue;
        };
        let span = balance::balanced_span(&document, found.span);
        document.insert_str(span.end, &close_marker(options));
        document.insert_str(span.start, &open_marker(target, options));
    }

    Injection { html: document, orphaned_ids }
}

fn open_marker(target: &HighlightTarget<'_>, options: &HighlightOptions) -> String {
    let state = if target.resolved { "resolved" } else { "open" };
    format!(
        r#"<{element} class="{class} {class}--{state}" data-comment-id="{id}">"#,
        element = options.element,
        class = escape_attr(&options.class),
        id = escape_attr(target.id),
    )
}

fn close_marker(options: &HighlightOptions) -> String {
    format!("</{}>", options.element)
}

fn escape_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor(text: &str, prefix: &str, suffix: &str) -> TextAnchor {
        TextAnchor::new(text, prefix, suffix).expect("valid anchor")
    }

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    fn markers_balanced(html: &str) -> bool {
        count(html, "<mark ") == count(html, "</mark>")
    }

    #[test]
    fn no_targets_returns_html_unchanged() {
        let html = "<h1>Title</h1><p>Body &amp; more</p>";
        let injection = inject(html, &[], &HighlightOptions::default());
        assert_eq!(injection.html, html);
        assert!(injection.orphaned_ids.is_empty());
    }

    #[test]
    fn single_target_is_wrapped_with_id_and_state() {
        let a = anchor("quick", "", "");
        let injection = inject(
            "<p>The quick fox</p>",
            &[HighlightTarget { id: "t1", anchor: &a, resolved: false }],
            &HighlightOptions::default(),
        );
        assert_eq!(
            injection.html,
            r#"<p>The <mark class="comment-highlight comment-highlight--open" data-comment-id="t1">quick</mark> fox</p>"#
        );
    }

    #[test]
    fn three_disjoint_targets_are_all_marked() {
        let html = "<p>alpha beta</p><p>gamma <em>delta</em> epsilon</p>";
        let a = anchor("alpha", "", "");
        let b = anchor("delta", "", "");
        let c = anchor("epsilon", "", "");
        let targets = [
            HighlightTarget { id: "a", anchor: &a, resolved: false },
            HighlightTarget { id: "b", anchor: &b, resolved: true },
            HighlightTarget { id: "c", anchor: &c, resolved: false },
        ];
        let injection = inject(html, &targets, &HighlightOptions::default());

        assert!(injection.orphaned_ids.is_empty());
        assert!(markers_balanced(&injection.html));
        for id in ["a", "b", "c"] {
            assert_eq!(count(&injection.html, &format!(r#"data-comment-id="{id}""#)), 1);
        }
        assert!(injection.html.contains(
            r#"<em><mark class="comment-highlight comment-highlight--resolved" data-comment-id="b">delta</mark></em>"#
        ));
    }

    #[test]
    fn unresolvable_target_is_orphaned_without_marker() {
        let (found, gone) = (anchor("stays", "", ""), anchor("was deleted", "", ""));
        let targets = [
            HighlightTarget { id: "gone", anchor: &gone, resolved: false },
            HighlightTarget { id: "found", anchor: &found, resolved: false },
        ];
        let injection = inject("<p>text stays here</p>", &targets, &HighlightOptions::default());

        assert_eq!(injection.orphaned_ids, vec!["gone".to_string()]);
        assert!(!injection.html.contains(r#"data-comment-id="gone""#));
        assert_eq!(count(&injection.html, r#"data-comment-id="found""#), 1);
    }

    #[test]
    fn overlapping_targets_nest_and_stay_balanced() {
        let html = "<p>one two three four</p>";
        let (left, right) = (anchor("one two three", "", ""), anchor("two three four", "", ""));
        let targets = [
            HighlightTarget { id: "left", anchor: &left, resolved: false },
            HighlightTarget { id: "right", anchor: &right, resolved: false },
        ];
        let injection = inject(html, &targets, &HighlightOptions::default());

        assert!(injection.orphaned_ids.is_empty());
        assert!(markers_balanced(&injection.html));
        assert_eq!(count(&injection.html, r#"data-comment-id="left""#), 1);
        assert_eq!(count(&injection.html, r#"data-comment-id="right""#), 1);
        let left_at = injection.html.find(r#"data-comment-id="left""#).unwrap();
        let right_at = injection.html.find(r#"data-comment-id="right""#).unwrap();
        assert!(left_at < right_at, "left marker must enclose the right one");
        assert!(injection.html.ends_with("four</mark></mark></p>"));
    }

    #[test]
    fn identical_spans_each_get_one_marker() {
        let (first, second) = (anchor("shared", "", ""), anchor("shared", "", ""));
        let targets = [
            HighlightTarget { id: "first", anchor: &first, resolved: false },
            HighlightTarget { id: "second", anchor: &second, resolved: true },
        ];
        let injection = inject("<p>a shared word</p>", &targets, &HighlightOptions::default());

        assert!(markers_balanced(&injection.html));
        assert_eq!(count(&injection.html, "data-comment-id="), 2);
        assert!(injection.html.contains("shared</mark></mark>"));
    }

    #[test]
    fn selection_across_inline_tag_keeps_markup_balanced() {
        let html = "<p>Hello <b>world</b>!</p>";
        let a = anchor("Hello world", "", "");
        let injection = inject(
            html,
            &[HighlightTarget { id: "x", anchor: &a, resolved: false }],
            &HighlightOptions::default(),
        );
        assert_eq!(
            injection.html,
            r#"<p><mark class="comment-highlight comment-highlight--open" data-comment-id="x">Hello <b>world</b></mark>!</p>"#
        );
    }

    #[test]
    fn custom_element_and_escaped_attributes() {
        let a = anchor("word", "", "");
        let options = HighlightOptions::new("span", "hl").unwrap();
        let injection = inject(
            "<p>word</p>",
            &[HighlightTarget { id: "a\"b", anchor: &a, resolved: true }],
            &options,
        );
        assert_eq!(
            injection.html,
            r#"<p><span class="hl hl--resolved" data-comment-id="a&quot;b">word</span></p>"#
        );
    }

    #[test]
    fn element_must_be_a_plain_non_void_tag_name() {
        assert!(HighlightOptions::new("x-note", "hl").is_ok());
        for bad in ["", "1mark", "mark onmouseover=alert(1)", "mark>", "span/", "é"] {
            assert_eq!(
                HighlightOptions::new(bad, "hl"),
                Err(HighlightError::InvalidElement(bad.to_string()))
            );
        }
        assert_eq!(
            HighlightOptions::new("BR", "hl"),
            Err(HighlightError::VoidElement("BR".to_string()))
        );
    }
}
