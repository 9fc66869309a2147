//! Conditional request support for static files
//!
//! `ETag` generation and `If-None-Match` matching.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Strong `ETag` for a file body: `"<len>-<hash>"` in hex
pub fn generate_etag(content: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("\"{:x}-{:x}\"", content.len(), hasher.finish())
}

/// Whether `If-None-Match` covers `etag`, i.e. the client copy is current.
///
/// Accepts a list of tags, weak tags (`W/"..."`) and the `*` wildcard.
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    if_none_match.is_some_and(|header| {
        header.split(',').map(str::trim).any(|candidate| {
            candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_etag_depends_on_content() {
        let a = generate_etag(b"viewer v1");
        assert_eq!(a, generate_etag(b"viewer v1"));
        assert_ne!(a, generate_etag(b"viewer v2"));
        assert!(a.starts_with('"') && a.ends_with('"'));
    }

    #[test]
    fn test_if_none_match_forms() {
        let etag = generate_etag(b"model");
        assert!(check_etag_match(Some(&etag), &etag));
        assert!(check_etag_match(Some(&format!("\"x\", {etag}")), &etag));
        assert!(check_etag_match(Some(&format!("W/{etag}")), &etag));
        assert!(check_etag_match(Some("*"), &etag));
        assert!(!check_etag_match(Some("\"other\""), &etag));
        assert!(!check_etag_match(None, &etag));
    }
}
