//! Handle normalization and slug derivation.

/// Prefix of every per-target working branch.
pub const BRANCH_PREFIX: &str = "boardd-";

/// Canonicalize a user handle.
///
/// Drops a legacy discriminator suffix (everything from the first `#`) and
/// lower-cases the remainder, so `"Foo#1234"` and `"foo"` compare equal.
pub fn normalize(tag: &str) -> String {
    let handle = match tag.split_once('#') {
        Some((handle, _discriminator)) => handle,
        None => tag,
    };
    handle.to_lowercase()
}

/// Derive a URL and filename safe slug from display text.
///
/// Whitespace runs become a single `-`, anything outside `[A-Za-z0-9-]` is
/// dropped and the result is lower-cased.
pub fn slug(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Working branch for a normalized target identity.
pub fn branch_name(target: &str) -> String {
    format!("{}{}", BRANCH_PREFIX, slug(target))
}

/// Asset filename for a resolved full name.
///
/// `None` when nothing of the name survives slugging.
pub fn picture_name(full_name: &str) -> Option<String> {
    let slug = slug(full_name);
    if slug.is_empty() {
        return None;
    }
    Some(format!("{}.webp", slug))
}
