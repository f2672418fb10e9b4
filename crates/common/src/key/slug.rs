// Title → slug. Alphanumeric runs are kept lowercased, everything else
// collapses into single hyphens.

/// Derive a page slug from a human title.
///
/// Non-ASCII letters and digits survive (keys are NFKC-normalized later), so
/// `"Café Tips"` becomes `"café-tips"`. A title with no letters or digits
/// yields an empty string.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut gap = false;
    for ch in title.chars() {
        if ch.is_alphanumeric() {
            if gap && !slug.is_empty() {
                slug.push('-');
            }
            gap = false;
            slug.extend(ch.to_lowercase());
        } else {
            gap = true;
        }
    }
    slug
}
