// Plain-text projection of an HTML fragment.
//
// Markup between `<` and the matching `>` is dropped and common character
// references are decoded. Every byte of the projected text remembers the
// HTML range of the source character it came from, so a span found in the
// projection maps back to HTML that never starts or ends inside a tag or an
// entity.

use std::ops::Range;

/// Longest entity we try to decode, `&` and `;` included.
const MAX_ENTITY_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextProjection {
    text: String,
    /// HTML offset where the source character of each projected byte starts.
    html_starts: Vec<usize>,
    /// HTML offset just past the source character of each projected byte.
    html_ends: Vec<usize>,
}

impl TextProjection {
    pub fn from_html(html: &str) -> Self {
        let mut projection = Self {
            text: String::with_capacity(html.len()),
            html_starts: Vec::with_capacity(html.len()),
            html_ends: Vec::with_capacity(html.len()),
        };

        let mut index = 0;
        while index < html.len() {
            let rest = &html[index..];
            if rest.starts_with('<') {
                if let Some(close) = rest.find('>') {
                    index += close + 1;
                    continue;
                }
            }
            if rest.starts_with('&') {
                if let Some((decoded, len)) = decode_entity(rest) {
                    projection.push(decoded, index, index + len);
                    index += len;
                    continue;
                }
            }
            let Some(ch) = rest.chars().next() else {
                break;
            };
            projection.push(ch, index, index + ch.len_utf8());
            index += ch.len_utf8();
        }

        projection
    }

    /// The text a reader sees, markup removed.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Map a non-empty span of the projected text back to HTML offsets.
    ///
    /// Returns `None` for empty or out-of-range spans.
    pub fn html_span(&self, span: Range<usize>) -> Option<Range<usize>> {
        if span.start >= span.end || span.end > self.text.len() {
            return None;
        }
        Some(self.html_starts[span.start]..self.html_ends[span.end - 1])
    }

    fn push(&mut self, ch: char, html_start: usize, html_end: usize) {
        self.text.push(ch);
        for _ in 0..ch.len_utf8() {
            self.html_starts.push(html_start);
            self.html_ends.push(html_end);
        }
    }
}

/// Decode the character reference at the start of `input` (which begins
/// with `&`). Returns the character and the reference's byte length.
fn decode_entity(input: &str) -> Option<(char, usize)> {
    let (semi, _) = input
        .char_indices()
        .take_while(|(offset, _)| *offset < MAX_ENTITY_LEN)
        .find(|(_, ch)| *ch == ';')?;
    let name = &input[1..semi];

    let ch = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        _ => {
            let numeric = name.strip_prefix('#')?;
            let code = match numeric.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => numeric.parse::<u32>().ok()?,
            };
            char::from_u32(code)?
        }
    };

    Some((ch, semi + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_keeps_text() {
        let projection = TextProjection::from_html("<p>Hello <b>world</b>!</p>");
        assert_eq!(projection.text(), "Hello world!");
    }

    #[test]
    fn maps_span_across_tag_boundary() {
        let html = "<p>Hello <b>world</b>!</p>";
        let projection = TextProjection::from_html(html);
        let span = projection.html_span(0..11).expect("span is in range");
        assert_eq!(&html[span], "Hello <b>world");
    }

    #[test]
    fn tag_attributes_never_leak_into_text() {
        let projection =
            TextProjection::from_html(r#"<a href="/wiki/rust" title="Rust">Rust</a> lang"#);
        assert_eq!(projection.text(), "Rust lang");
    }

    #[test]
    fn decodes_entities_and_maps_back_to_whole_reference() {
        let html = "<p>Tom &amp; Jerry &#8212; &#x27;cartoon&#x27;</p>";
        let projection = TextProjection::from_html(html);
        assert_eq!(projection.text(), "Tom & Jerry \u{2014} 'cartoon'");

        let amp = projection.text().find('&').unwrap();
        let span = projection.html_span(amp..amp + 1).unwrap();
        assert_eq!(&html[span], "&amp;");
    }

    #[test]
    fn unknown_entity_and_lone_brackets_stay_literal() {
        let projection = TextProjection::from_html("a &bogus; b < c");
        assert_eq!(projection.text(), "a &bogus; b < c");
    }

    #[test]
    fn multibyte_characters_map_to_their_full_width() {
        let html = "<i>naïve</i> café";
        let projection = TextProjection::from_html(html);
        let start = projection.text().find("café").unwrap();
        let span = projection.html_span(start..start + "café".len()).unwrap();
        assert_eq!(&html[span], "café");
    }

    #[test]
    fn empty_or_out_of_range_span_is_none() {
        let projection = TextProjection::from_html("<p>abc</p>");
        assert!(projection.html_span(1..1).is_none());
        assert!(projection.html_span(0..4).is_none());
    }
}
