// Span balancing: grow a span outward until every element opened inside it
// is also closed inside it, so a marker wrapped around it nests cleanly.

use std::collections::VecDeque;
use std::ops::Range;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements that never have content, matched case-insensitively.
pub(super) fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name.to_ascii_lowercase().as_str())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Tag {
    name: String,
    closing: bool,
    range: Range<usize>,
}

/// Extend `span` to the enclosing open/close tags of any element it only
/// partially covers. Void elements, self-closing tags, comments and
/// declarations never need balancing.
pub(crate) fn balanced_span(html: &str, span: Range<usize>) -> Range<usize> {
    let tags = scan_tags(html);

    let mut opened: Vec<&Tag> = Vec::new();
    let mut unmatched_closes: VecDeque<&str> = VecDeque::new();
    let inside =
        tags.iter().filter(|tag| tag.range.start >= span.start && tag.range.end <= span.end);
    for tag in inside {
        if !tag.closing {
            opened.push(tag);
            continue;
        }
        match opened.iter().rposition(|open| open.name == tag.name) {
            Some(position) => opened.truncate(position),
            None => unmatched_closes.push_back(&tag.name),
        }
    }
    let unmatched_opens: VecDeque<&str> =
        opened.iter().rev().map(|tag| tag.name.as_str()).collect();

    let before = tags.iter().rev().filter(|tag| tag.range.end <= span.start);
    let start = extend(before, unmatched_closes, true).map_or(span.start, |tag| tag.range.start);

    let after = tags.iter().filter(|tag| tag.range.start >= span.end);
    let end = extend(after, unmatched_opens, false).map_or(span.end, |tag| tag.range.end);

    start..end
}

/// Walk `tags` away from the span looking for the partners of `pending`, in
/// order. Returns the outermost partner found.
///
/// `seeking_openers` is true when walking backwards for opening tags.
fn extend<'a>(
    tags: impl Iterator<Item = &'a Tag>,
    mut pending: VecDeque<&str>,
    seeking_openers: bool,
) -> Option<&'a Tag> {
    let mut skipped: Vec<&str> = Vec::new();
    let mut outermost = None;

    for tag in tags {
        if pending.is_empty() {
            break;
        }
        let is_partner_kind = tag.closing != seeking_openers;
        if !is_partner_kind {
            skipped.push(&tag.name);
        } else if skipped.last() == Some(&tag.name.as_str()) {
            skipped.pop();
        } else if pending.front() == Some(&tag.name.as_str()) {
            pending.pop_front();
            outermost = Some(tag);
        }
    }

    outermost
}

fn scan_tags(html: &str) -> Vec<Tag> {
    let mut tags = Vec::new();
    let mut index = 0;

    while let Some(open) = html[index..].find('<') {
        let start = index + open;
        let Some(close) = html[start..].find('>') else {
            break;
        };
        let end = start + close + 1;
        if let Some(tag) = parse_tag(&html[start..end], start..end) {
            tags.push(tag);
        }
        index = end;
    }

    tags
}

fn parse_tag(raw: &str, range: Range<usize>) -> Option<Tag> {
    let inner = raw.strip_prefix('<')?.strip_suffix('>')?;
    let (closing, body) = match inner.strip_prefix('/') {
        Some(body) => (true, body),
        None => (false, inner),
    };

    let name: String = body
        .chars()
        .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '-' || *ch == ':')
        .collect::<String>()
        .to_ascii_lowercase();
    if name.is_empty() || VOID_ELEMENTS.contains(&name.as_str()) {
        return None;
    }
    if !closing && body.trim_end().ends_with('/') {
        return None;
    }

    Some(Tag { name, closing, range })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balance(html: &str, selected: &str) -> String {
        let start = html.find(selected).expect("selection is in html");
        let span = balanced_span(html, start..start + selected.len());
        html[span].to_string()
    }

    #[test]
    fn balanced_span_is_unchanged() {
        assert_eq!(balance("<p>a <b>bold</b> c</p>", "a <b>bold</b> c"), "a <b>bold</b> c");
        assert_eq!(balance("<p>plain text</p>", "plain"), "plain");
    }

    #[test]
    fn unclosed_open_tag_extends_end() {
        assert_eq!(balance("<p>Hello <b>world</b>!</p>", "Hello <b>world"), "Hello <b>world</b>");
    }

    #[test]
    fn unopened_close_tag_extends_start() {
        assert_eq!(
            balance("<p>x <i>it<b>alic</b></i> tail</p>", "alic</b></i> tail"),
            "<i>it<b>alic</b></i> tail"
        );
    }

    #[test]
    fn selection_across_paragraphs_covers_both() {
        assert_eq!(
            balance("<p>first para</p><p>second para</p>", "para</p><p>second"),
            "<p>first para</p><p>second para</p>"
        );
    }

    #[test]
    fn void_and_self_closing_tags_are_ignored() {
        let selected = r#"line<br>next<img src="a.png"/>end"#;
        assert_eq!(balance(&format!("<p>{selected}</p>"), selected), selected);
    }

    #[test]
    fn closed_siblings_before_span_are_skipped() {
        assert_eq!(
            balance("<div><b>x</b><em>y</em> z</div><p>after</p>", "y</em> z</div><p>after"),
            "<div><b>x</b><em>y</em> z</div><p>after</p>"
        );
    }

    #[test]
    fn tag_names_compare_case_insensitively() {
        assert_eq!(balance("<P>Hi <B>there</b> you</p>", "Hi <B>there"), "Hi <B>there</b>");
    }
}
