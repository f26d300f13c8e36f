//! Magnet link extraction from chat text.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use super::MagnetLink;

/// Regex pattern for finding magnet URIs in text.
/// Matches `magnet:?` followed by one or more `key=value` pairs joined by `&`.
#[allow(clippy::expect_used)]
static MAGNET_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)magnet:\?[A-Za-z0-9._~-]+=[^\s&<>"'#]*(?:&[A-Za-z0-9._~-]+=[^\s&<>"'#]*)*"#)
        .expect("magnet regex is valid") // Static pattern, safe to panic
});

/// Finds the first magnet URI in `text`.
///
/// Only the first candidate is considered. If it lacks an `xt=urn:btih:`
/// parameter the result is `None`, the same as text without any candidate:
/// such a match is indistinguishable from unrelated text that happens to
/// contain the literal prefix.
///
/// # Examples
///
/// ```
/// use magnet_resolver_core::magnet::extract_magnet;
///
/// let link = extract_magnet("grab this: magnet:?xt=urn:btih:abc123&dn=demo").unwrap();
/// assert_eq!(link.as_str(), "magnet:?xt=urn:btih:abc123&dn=demo");
///
/// assert!(extract_magnet("no links here").is_none());
/// ```
#[tracing::instrument(skip(text), fields(text_len = text.len()))]
#[must_use]
pub fn extract_magnet(text: &str) -> Option<MagnetLink> {
    let candidate = MAGNET_PATTERN.find(text)?;
    let cleaned = clean_magnet_trailing(candidate.as_str());
    trace!(candidate = %cleaned, "found magnet candidate");

    let link = MagnetLink::parse(cleaned);
    if link.is_none() {
        debug!("magnet candidate has no info-hash parameter, ignoring");
    }
    link
}

/// Strips sentence punctuation that often gets captured at the end of a link.
fn clean_magnet_trailing(link: &str) -> &str {
    let mut result = link;

    while let Some(last) = result.chars().last() {
        match last {
            '.' | ',' | ';' | ':' | '!' | '?' => {
                result = &result[..result.len() - 1];
            }
            ')' | ']' => {
                let open = if last == ')' { '(' } else { '[' };
                let open_count = result.chars().filter(|&c| c == open).count();
                let close_count = result.chars().filter(|&c| c == last).count();
                if close_count > open_count {
                    result = &result[..result.len() - 1];
                } else {
                    break;
                }
            }
            _ => break,
        }
    }

    result
}
