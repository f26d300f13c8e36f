//! Offline magnet URI decoding.
//!
//! Two interchangeable strategies recover [`LocalMetadata`] from the URI text:
//! [`StructuredDecoder`] parses the link as a URL and reads its query pairs,
//! [`ManualDecoder`] splits the raw string by hand. [`LocalDecoder`] tries
//! them in order and returns the first usable result; results are never merged.

use std::borrow::Cow;

use tracing::{debug, trace};
use url::Url;

use super::{LocalMetadata, has_magnet_prefix};

/// A strategy for decoding a magnet URI without network access.
pub trait MagnetDecoder: Send + Sync {
    /// Returns the decoder's name for logging (e.g. "structured", "manual").
    fn name(&self) -> &'static str;

    /// Returns false when this strategy cannot run in the current environment.
    fn is_available(&self) -> bool {
        true
    }

    /// Decodes `link`, returning `None` when the strategy is unavailable for
    /// this input or no hash could be recovered.
    fn decode(&self, link: &str) -> Option<LocalMetadata>;
}

/// Decodes magnet links through full URL parsing.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredDecoder;

impl MagnetDecoder for StructuredDecoder {
    fn name(&self) -> &'static str {
        "structured"
    }

    fn decode(&self, link: &str) -> Option<LocalMetadata> {
        let parsed = match Url::parse(link) {
            Ok(parsed) => parsed,
            Err(error) => {
                debug!(error = %error, "structured decode could not parse link");
                return None;
            }
        };
        if parsed.scheme() != "magnet" {
            return None;
        }

        let mut metadata = LocalMetadata::empty();
        for (key, value) in parsed.query_pairs() {
            trace!(key = %key, value = %value, "structured decode pair");
            metadata.apply_param(&key, &value);
        }
        metadata.is_usable().then_some(metadata)
    }
}

/// Decodes magnet links by splitting the raw string on `&` and `=`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualDecoder;

impl MagnetDecoder for ManualDecoder {
    fn name(&self) -> &'static str {
        "manual"
    }

    fn decode(&self, link: &str) -> Option<LocalMetadata> {
        let mut metadata = LocalMetadata::empty();
        for (key, value) in query_pairs(link)? {
            trace!(key = %key, value = %value, "manual decode pair");
            metadata.apply_param(&key, &value);
        }
        metadata.is_usable().then_some(metadata)
    }
}

/// Splits the query of a `magnet:?` URI into decoded `key=value` pairs.
///
/// The query ends at the first `#`, matching URL fragment handling.
/// Returns `None` without the magnet prefix.
pub(super) fn query_pairs(link: &str) -> Option<impl Iterator<Item = (String, String)> + '_> {
    if !has_magnet_prefix(link) {
        return None;
    }
    let query = link[8..].split('#').next().unwrap_or_default();
    Some(
        query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode_component(raw_key), decode_component(raw_value))
            }),
    )
}

/// Percent-decodes a query component with form semantics (`+` is a space),
/// replacing invalid UTF-8 sequences the same way URL query parsing does.
fn decode_component(raw: &str) -> String {
    let spaced: Cow<'_, str> = if raw.contains('+') {
        Cow::Owned(raw.replace('+', " "))
    } else {
        Cow::Borrowed(raw)
    };
    String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes())).into_owned()
}

/// Ordered chain of decoding strategies.
pub struct LocalDecoder {
    decoders: Vec<Box<dyn MagnetDecoder>>,
}

impl LocalDecoder {
    /// Creates a chain from explicit strategies, tried in the given order.
    #[must_use]
    pub fn new(decoders: Vec<Box<dyn MagnetDecoder>>) -> Self {
        Self { decoders }
    }

    /// Returns the names of the configured strategies in order.
    #[must_use]
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.decoders.iter().map(|decoder| decoder.name()).collect()
    }

    /// Decodes `link` with the first strategy that yields usable metadata.
    #[tracing::instrument(skip(self, link))]
    #[must_use]
    pub fn decode(&self, link: &str) -> Option<LocalMetadata> {
        for decoder in &self.decoders {
            if !decoder.is_available() {
                debug!(decoder = decoder.name(), "decoder unavailable, skipping");
                continue;
            }
            if let Some(metadata) = decoder.decode(link) {
                debug!(
                    decoder = decoder.name(),
                    trackers = metadata.trackers.len(),
                    "local decode succeeded"
                );
                return Some(metadata);
            }
            debug!(decoder = decoder.name(), "decoder yielded nothing, falling through");
        }
        None
    }
}

impl Default for LocalDecoder {
    fn default() -> Self {
        Self::new(vec![Box::new(StructuredDecoder), Box::new(ManualDecoder)])
    }
}

impl std::fmt::Debug for LocalDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalDecoder")
            .field("strategies", &self.strategy_names())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::magnet::UNKNOWN_NAME;

    const FULL_LINK: &str = "magnet:?xt=urn:btih:dd8255ecdc7ca55fb0bbf81323d87062db1f6d1c\
        &dn=Big+Buck+Bunny%20%282008%29\
        &tr=udp%3A%2F%2Fexplodie.org%3A6969\
        &tr=udp%3A%2F%2Ftracker.opentrackr.org%3A1337%2Fannounce\
        &xl=276445467";

    struct UnavailableDecoder;

    impl MagnetDecoder for UnavailableDecoder {
        fn name(&self) -> &'static str {
            "unavailable"
        }

        fn is_available(&self) -> bool {
            false
        }

        fn decode(&self, _link: &str) -> Option<LocalMetadata> {
            panic!("unavailable decoder must not be invoked");
        }
    }

    struct CountingDecoder {
        calls: Arc<AtomicUsize>,
        result: Option<LocalMetadata>,
    }

    impl MagnetDecoder for CountingDecoder {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn decode(&self, _link: &str) -> Option<LocalMetadata> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    // ==================== StructuredDecoder ====================

    #[test]
    fn test_structured_decode_full_link() {
        let meta = StructuredDecoder.decode(FULL_LINK).unwrap();
        assert_eq!(meta.hash, "dd8255ecdc7ca55fb0bbf81323d87062db1f6d1c");
        assert_eq!(meta.name, "Big Buck Bunny (2008)");
        assert_eq!(
            meta.trackers,
            vec![
                "udp://explodie.org:6969".to_string(),
                "udp://tracker.opentrackr.org:1337/announce".to_string(),
            ]
        );
        assert_eq!(meta.size, Some(276_445_467));
    }

    #[test]
    fn test_structured_decode_rejects_other_scheme() {
        assert!(
            StructuredDecoder
                .decode("https://example.com/?xt=urn:btih:abc")
                .is_none()
        );
    }

    #[test]
    fn test_structured_decode_no_hash_is_unavailable() {
        assert!(StructuredDecoder.decode("magnet:?dn=nothing").is_none());
    }

    // ==================== ManualDecoder ====================

    #[test]
    fn test_manual_decode_full_link() {
        let meta = ManualDecoder.decode(FULL_LINK).unwrap();
        assert_eq!(meta.hash, "dd8255ecdc7ca55fb0bbf81323d87062db1f6d1c");
        assert_eq!(meta.name, "Big Buck Bunny (2008)");
        assert_eq!(meta.trackers.len(), 2);
        assert_eq!(meta.size, Some(276_445_467));
    }

    #[test]
    fn test_manual_decode_defaults_and_bad_size() {
        let meta = ManualDecoder
            .decode("magnet:?xt=urn:btih:abc&xl=twelve")
            .unwrap();
        assert_eq!(meta.hash, "abc");
        assert_eq!(meta.name, UNKNOWN_NAME);
        assert!(meta.trackers.is_empty());
        assert_eq!(meta.size, None);
        assert!(meta.is_sparse());
    }

    #[test]
    fn test_manual_decode_requires_prefix() {
        assert!(ManualDecoder.decode("xt=urn:btih:abc").is_none());
    }

    #[test]
    fn test_manual_decode_value_with_equals_sign() {
        let meta = ManualDecoder
            .decode("magnet:?xt=urn:btih:abc&dn=a=b")
            .unwrap();
        assert_eq!(meta.name, "a=b");
    }

    // ==================== Strategy consistency ====================

    #[test]
    fn test_decoders_agree_on_well_formed_links() {
        let links = [
            FULL_LINK,
            "magnet:?xt=urn:btih:abc",
            "magnet:?dn=first&xt=urn:btih:ABC&dn=second&tr=http%3A%2F%2Ft%2Fa",
            "magnet:?xt=urn:btmh:1220caf1e1c30e81cb361b9ee167c4aa64228a7fa4fa9f6105232b28ad099f3a302e&xl=0",
            "magnet:?xt=urn:btih:abc&dn=%E4%B8%AD%E6%96%87&xl=12x",
            "magnet:?xt=urn:btih:abc&dn=a#b",
            "MAGNET:?XT=URN:BTIH:abc&DN=upper&TR=udp%3A%2F%2Ft&XL=7",
        ];
        for link in links {
            assert_eq!(
                StructuredDecoder.decode(link),
                ManualDecoder.decode(link),
                "decoders disagree on {link}"
            );
        }
    }

    // ==================== LocalDecoder chain ====================

    #[test]
    fn test_local_decoder_default_order() {
        let decoder = LocalDecoder::default();
        assert_eq!(decoder.strategy_names(), vec!["structured", "manual"]);
    }

    #[test]
    fn test_local_decoder_skips_unavailable_strategy() {
        let decoder = LocalDecoder::new(vec![Box::new(UnavailableDecoder), Box::new(ManualDecoder)]);
        let meta = decoder.decode("magnet:?xt=urn:btih:abc&dn=x").unwrap();
        assert_eq!(meta.name, "x");
    }

    #[test]
    fn test_local_decoder_falls_through_on_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let decoder = LocalDecoder::new(vec![
            Box::new(CountingDecoder {
                calls: Arc::clone(&calls),
                result: None,
            }),
            Box::new(ManualDecoder),
        ]);
        assert!(decoder.decode("magnet:?xt=urn:btih:abc").is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_local_decoder_does_not_merge_results() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut first = LocalMetadata::empty();
        first.hash = "from-first".to_string();
        let decoder = LocalDecoder::new(vec![
            Box::new(CountingDecoder {
                calls: Arc::clone(&calls),
                result: Some(first),
            }),
            Box::new(ManualDecoder),
        ]);
        let meta = decoder
            .decode("magnet:?xt=urn:btih:abc&dn=named&tr=udp%3A%2F%2Ft")
            .unwrap();
        assert_eq!(meta.hash, "from-first");
        assert_eq!(meta.name, UNKNOWN_NAME);
        assert!(meta.trackers.is_empty());
    }

    #[test]
    fn test_manual_decode_stops_at_fragment() {
        let meta = ManualDecoder.decode("magnet:?xt=urn:btih:abc&dn=a#b&tr=x").unwrap();
        assert_eq!(meta.name, "a");
        assert!(meta.trackers.is_empty());
    }

    #[test]
    fn test_local_decoder_uppercase_keys() {
        let link = "MAGNET:?XT=URN:BTIH:c9e15763f722f23e98a29decdfae341b98d53056&DN=x";
        let meta = LocalDecoder::default().decode(link).unwrap();
        assert_eq!(meta.hash, "c9e15763f722f23e98a29decdfae341b98d53056");
        assert_eq!(meta.name, "x");
    }

    #[test]
    fn test_local_decoder_all_strategies_exhausted() {
        let decoder = LocalDecoder::default();
        assert!(decoder.decode("magnet:?dn=nohash").is_none());
    }
}
