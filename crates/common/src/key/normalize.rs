// Page key segment canonicalization: NFKC normalization, separator and traversal rejection,
// 128 char max.

use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

/// Maximum allowed segment length in characters.
pub const MAX_SEGMENT_CHARS: usize = 128;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("{0} is empty")]
    Empty(&'static str),

    #[error("{0} exceeds maximum length of {MAX_SEGMENT_CHARS} characters")]
    TooLong(&'static str),

    #[error("{field} must not be a relative path component: {value}")]
    Traversal { field: &'static str, value: String },

    #[error("{0} contains null byte")]
    NullByte(&'static str),

    #[error("{0} must not contain path separators")]
    Separator(&'static str),
}

/// Normalize one segment (`project` or `slug`) of a page key.
///
/// Rules:
/// - Apply Unicode NFKC normalization
/// - Trim surrounding whitespace
/// - Reject empty, `.` and `..` segments
/// - Reject `/`, `\` and null bytes
/// - Enforce max 128 character limit (after normalization)
pub fn normalize_segment(field: &'static str, input: &str) -> Result<String, KeyError> {
    if input.contains('\0') {
        return Err(KeyError::NullByte(field));
    }

    let normalized: String = input.nfkc().collect();
    let trimmed = normalized.trim();

    if trimmed.is_empty() {
        return Err(KeyError::Empty(field));
    }
    if trimmed.contains(['/', '\\']) {
        return Err(KeyError::Separator(field));
    }
    if trimmed == "." || trimmed == ".." {
        return Err(KeyError::Traversal { field, value: trimmed.to_string() });
    }
    if trimmed.chars().count() > MAX_SEGMENT_CHARS {
        return Err(KeyError::TooLong(field));
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_segment() {
        assert_eq!(normalize_segment("slug", "getting-started").unwrap(), "getting-started");
    }

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(normalize_segment("project", "  handbook \n").unwrap(), "handbook");
    }

    #[test]
    fn test_unicode_nfkc() {
        // NFKC normalizes ﬁ (U+FB01, fi ligature) to "fi"
        assert_eq!(normalize_segment("slug", "\u{FB01}le").unwrap(), "file");
    }

    #[test]
    fn test_unicode_combining() {
        let composed = normalize_segment("slug", "caf\u{0065}\u{0301}").unwrap();
        let expected = normalize_segment("slug", "café").unwrap();
        assert_eq!(composed, expected);
    }

    #[test]
    fn test_reject_separators() {
        assert_eq!(normalize_segment("slug", "a/b"), Err(KeyError::Separator("slug")));
        assert_eq!(normalize_segment("project", "a\\b"), Err(KeyError::Separator("project")));
    }

    #[test]
    fn test_reject_dotdot() {
        assert_eq!(
            normalize_segment("project", ".."),
            Err(KeyError::Traversal { field: "project", value: "..".to_string() })
        );
    }

    #[test]
    fn test_reject_empty_and_whitespace() {
        assert_eq!(normalize_segment("slug", ""), Err(KeyError::Empty("slug")));
        assert_eq!(normalize_segment("slug", "   "), Err(KeyError::Empty("slug")));
    }

    #[test]
    fn test_reject_null_byte() {
        assert_eq!(normalize_segment("slug", "a\0b"), Err(KeyError::NullByte("slug")));
    }

    #[test]
    fn test_length_limit() {
        assert!(normalize_segment("slug", &"a".repeat(128)).is_ok());
        assert_eq!(normalize_segment("slug", &"a".repeat(129)), Err(KeyError::TooLong("slug")));
    }

    #[test]
    fn test_triple_dot_allowed() {
        assert_eq!(normalize_segment("slug", "...").unwrap(), "...");
    }
}
