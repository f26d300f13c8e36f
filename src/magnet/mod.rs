//! Magnet link extraction and offline decoding.
//!
//! This module owns everything that can be learned about a magnet URI without
//! touching the network:
//! - [`extract_magnet`] - finds the first magnet candidate in chat text
//! - [`MagnetLink`] - validated, immutable magnet URI
//! - [`LocalDecoder`] - ordered chain of [`MagnetDecoder`] strategies producing
//!   [`LocalMetadata`] when the remote lookup service cannot be used

mod decode;
mod extract;

pub use decode::{LocalDecoder, MagnetDecoder, ManualDecoder, StructuredDecoder};
pub use extract::extract_magnet;

use std::fmt;

/// Placeholder name used when a magnet link carries no `dn` parameter.
pub const UNKNOWN_NAME: &str = "unknown";

/// Namespace markers accepted in the `xt` parameter (BitTorrent v1 and v2).
pub(crate) const HASH_NAMESPACES: [&str; 2] = ["urn:btih:", "urn:btmh:"];

/// A magnet URI that carries a BitTorrent info-hash parameter.
///
/// Constructed only through [`MagnetLink::parse`] or [`extract_magnet`], so any
/// value of this type is known to start with `magnet:?` and contain an
/// `xt=urn:btih:`-style parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MagnetLink(String);

impl MagnetLink {
    /// Validates `raw` as a magnet URI with a hash parameter.
    ///
    /// Returns `None` when the scheme is missing or no `xt` parameter carries
    /// a non-empty hash.
    ///
    /// # Examples
    ///
    /// ```
    /// use magnet_resolver_core::magnet::MagnetLink;
    ///
    /// assert!(MagnetLink::parse("magnet:?xt=urn:btih:ABCDEF").is_some());
    /// assert!(MagnetLink::parse("magnet:?dn=no-hash").is_none());
    /// assert!(MagnetLink::parse("magnet:?xt=urn:btih:&dn=empty").is_none());
    /// ```
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if !has_magnet_prefix(raw) || !has_hash_parameter(raw) {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    /// Returns the raw URI text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MagnetLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MagnetLink {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Metadata recovered from the magnet URI itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalMetadata {
    /// Info hash with the namespace marker stripped. Never empty.
    pub hash: String,
    /// Display name, or [`UNKNOWN_NAME`].
    pub name: String,
    /// Tracker URLs in the order they appear in the link.
    pub trackers: Vec<String>,
    /// Exact length in bytes from the `xl` parameter.
    pub size: Option<u64>,
}

impl LocalMetadata {
    pub(crate) fn empty() -> Self {
        Self {
            hash: String::new(),
            name: UNKNOWN_NAME.to_string(),
            trackers: Vec::new(),
            size: None,
        }
    }

    /// Returns true when the hash is present, the only hard requirement.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        !self.hash.is_empty()
    }

    /// Returns true when nothing besides the hash carries information.
    #[must_use]
    pub fn is_sparse(&self) -> bool {
        self.name == UNKNOWN_NAME && self.size.is_none() && self.trackers.is_empty()
    }

    /// Applies one decoded `key=value` pair.
    ///
    /// Shared by both decoders so they agree on field semantics: the first
    /// `xt` hash and first `dn` win, every `tr` is appended, and a non-numeric
    /// `xl` is ignored.
    /// Keys are matched case-insensitively.
    pub(crate) fn apply_param(&mut self, key: &str, value: &str) {
        match key.to_ascii_lowercase().as_str() {
            "xt" => {
                if self.hash.is_empty()
                    && let Some(hash) = strip_hash_namespace(value)
                {
                    self.hash = hash.to_string();
                }
            }
            "dn" => {
                if self.name == UNKNOWN_NAME && !value.is_empty() {
                    self.name = value.to_string();
                }
            }
            "tr" => {
                if !value.is_empty() {
                    self.trackers.push(value.to_string());
                }
            }
            "xl" => {
                if self.size.is_none()
                    && let Ok(size) = value.trim().parse::<u64>()
                {
                    self.size = Some(size);
                }
            }
            _ => {}
        }
    }
}

pub(crate) fn has_magnet_prefix(value: &str) -> bool {
    value
        .get(..8)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("magnet:?"))
}

/// Returns true when some `xt` parameter carries a non-empty hash in a
/// known namespace, judged with the same pair splitting the decoders use.
fn has_hash_parameter(value: &str) -> bool {
    decode::query_pairs(value).is_some_and(|mut pairs| {
        pairs.any(|(key, param)| {
            key.eq_ignore_ascii_case("xt") && strip_hash_namespace(&param).is_some()
        })
    })
}

/// Strips the BitTorrent namespace marker from an `xt` value.
///
/// Returns `None` for other namespaces or an empty hash.
fn strip_hash_namespace(value: &str) -> Option<&str> {
    HASH_NAMESPACES.iter().find_map(|namespace| {
        let prefix = value.get(..namespace.len())?;
        if !prefix.eq_ignore_ascii_case(namespace) {
            return None;
        }
        let hash = value[namespace.len()..].trim();
        (!hash.is_empty()).then_some(hash)
    })
}
