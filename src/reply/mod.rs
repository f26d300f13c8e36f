//! Reply assembly.
//!
//! Turns classified metadata into the ordered list of [`ReplyUnit`]s the host
//! should send. The shape depends on delivery options:
//! - `send_separately`: text first, then one unit per fetched screenshot
//! - otherwise: a single [`ReplyUnit::Composite`], marked [`Delivery::Forward`]
//!   when forwarding is enabled and the platform supports it
//!
//! Locally decoded metadata always yields exactly one text unit.

mod format;
mod screenshots;

pub use format::{
    INCOMPLETE_DATA_NOTICE, RESOLVING_NOTICE, UNRESOLVABLE_NOTICE, format_bytes, local_text,
    remote_text, service_error_notice, throttled_notice, type_badge, unavailable_notice,
};
pub use screenshots::{
    FetchError, HttpScreenshotFetcher, MAX_SCREENSHOT_BYTES, SCREENSHOT_MIME, ScreenshotFetcher,
    fetch_all,
};

use std::sync::Arc;

use tracing::debug;

use crate::magnet::LocalMetadata;
use crate::resolver::RemoteMetadata;
use crate::transport::Platform;

/// A downloaded image ready to send.
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    /// Where the image was fetched from.
    pub source_url: String,
    /// Declared content type.
    pub mime: &'static str,
    /// Raw image bytes.
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePayload")
            .field("source_url", &self.source_url)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// How a composite reply should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Standard message with text and images inline.
    Inline,
    /// Collapsed forwarded-message bundle.
    Forward,
}

/// One sendable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyUnit {
    /// Plain text block.
    Text(String),
    /// Text that quotes the triggering message (status and failure notices).
    Notice(String),
    /// A single image.
    Image(ImagePayload),
    /// Text plus zero or more images sent as one message.
    Composite {
        text: String,
        images: Vec<ImagePayload>,
        delivery: Delivery,
    },
}

impl ReplyUnit {
    /// Returns the text carried by this unit, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) | Self::Notice(text) | Self::Composite { text, .. } => Some(text.as_str()),
            Self::Image(_) => None,
        }
    }
}

/// Delivery toggles for remote replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyOptions {
    /// Fetch and attach screenshots.
    pub show_screenshot: bool,
    /// Send text and each image as separate messages. Wins over `use_forward`.
    pub send_separately: bool,
    /// Bundle the reply as a forwarded message where supported.
    pub use_forward: bool,
}

impl Default for ReplyOptions {
    fn default() -> Self {
        Self {
            show_screenshot: true,
            send_separately: false,
            use_forward: false,
        }
    }
}

/// Builds replies from classified metadata.
pub struct ReplyFormatter {
    options: ReplyOptions,
    fetcher: Arc<dyn ScreenshotFetcher>,
}

impl ReplyFormatter {
    /// Creates a formatter with the given options and screenshot source.
    #[must_use]
    pub fn new(options: ReplyOptions, fetcher: Arc<dyn ScreenshotFetcher>) -> Self {
        Self { options, fetcher }
    }

    /// Returns the configured options.
    #[must_use]
    pub fn options(&self) -> ReplyOptions {
        self.options
    }

    /// Builds the reply for remote metadata, fetching screenshots if enabled.
    #[tracing::instrument(skip(self, meta), fields(screenshots = meta.screenshots.len()))]
    pub async fn remote_reply(&self, meta: &RemoteMetadata, platform: &Platform) -> Vec<ReplyUnit> {
        let wants_screenshots = self.options.show_screenshot && !meta.screenshots.is_empty();
        let text = remote_text(meta, wants_screenshots);

        let images = if wants_screenshots {
            fetch_all(self.fetcher.as_ref(), &meta.screenshots).await
        } else {
            Vec::new()
        };

        if self.options.send_separately {
            let mut units = Vec::with_capacity(1 + images.len());
            units.push(ReplyUnit::Text(text));
            units.extend(images.into_iter().map(ReplyUnit::Image));
            return units;
        }

        let delivery = if self.options.use_forward && platform.supports_forward() {
            Delivery::Forward
        } else {
            Delivery::Inline
        };
        debug!(?delivery, images = images.len(), "assembled composite reply");
        vec![ReplyUnit::Composite {
            text,
            images,
            delivery,
        }]
    }

    /// Builds the reduced reply for locally decoded metadata.
    #[must_use]
    pub fn local_reply(&self, meta: &LocalMetadata) -> ReplyUnit {
        ReplyUnit::Text(local_text(meta))
    }
}

impl std::fmt::Debug for ReplyFormatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyFormatter")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::resolver::FileType;

    #[derive(Default)]
    struct StubFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ScreenshotFetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<ImagePayload, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if url.ends_with("missing") {
                return Err(FetchError::new(url, "HTTP 404"));
            }
            Ok(ImagePayload {
                source_url: url.to_string(),
                mime: SCREENSHOT_MIME,
                bytes: vec![0xFF, 0xD8],
            })
        }
    }

    fn meta_with(screenshots: &[&str]) -> RemoteMetadata {
        RemoteMetadata {
            name: "Tears of Steel".to_string(),
            size: 1024,
            count: 2,
            file_type: Some(FileType::Video),
            screenshots: screenshots.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    fn formatter(options: ReplyOptions) -> (ReplyFormatter, Arc<StubFetcher>) {
        let fetcher = Arc::new(StubFetcher::default());
        (ReplyFormatter::new(options, fetcher.clone()), fetcher)
    }

    #[tokio::test]
    async fn test_remote_reply_separate_units_in_order() {
        let (formatter, _) = formatter(ReplyOptions {
            send_separately: true,
            ..ReplyOptions::default()
        });
        let units = formatter
            .remote_reply(&meta_with(&["https://i/1", "https://i/2", "https://i/3"]), &Platform::Console)
            .await;
        assert_eq!(units.len(), 4);
        assert!(matches!(&units[0], ReplyUnit::Text(text) if text.contains("Tears of Steel")));
        for (unit, expected) in units[1..].iter().zip(["https://i/1", "https://i/2", "https://i/3"]) {
            let ReplyUnit::Image(image) = unit else {
                panic!("expected image unit");
            };
            assert_eq!(image.source_url, expected);
        }
    }

    #[tokio::test]
    async fn test_remote_reply_separate_wins_over_forward() {
        let (formatter, _) = formatter(ReplyOptions {
            send_separately: true,
            use_forward: true,
            show_screenshot: true,
        });
        let units = formatter
            .remote_reply(&meta_with(&["https://i/1"]), &Platform::OneBot)
            .await;
        assert_eq!(units.len(), 2);
        assert!(matches!(units[0], ReplyUnit::Text(_)));
    }

    #[tokio::test]
    async fn test_remote_reply_forward_on_supported_platform() {
        let (formatter, _) = formatter(ReplyOptions {
            use_forward: true,
            ..ReplyOptions::default()
        });
        let units = formatter
            .remote_reply(&meta_with(&["https://i/1", "https://i/missing"]), &Platform::Qq)
            .await;
        assert_eq!(units.len(), 1);
        let ReplyUnit::Composite { images, delivery, text } = &units[0] else {
            panic!("expected composite");
        };
        assert_eq!(*delivery, Delivery::Forward);
        assert_eq!(images.len(), 1);
        assert!(text.contains("Screenshots preview"));
    }

    #[tokio::test]
    async fn test_remote_reply_forward_unsupported_platform_is_inline() {
        let (formatter, _) = formatter(ReplyOptions {
            use_forward: true,
            ..ReplyOptions::default()
        });
        let units = formatter
            .remote_reply(&meta_with(&[]), &Platform::Telegram)
            .await;
        assert!(matches!(
            &units[0],
            ReplyUnit::Composite { delivery: Delivery::Inline, images, .. } if images.is_empty()
        ));
    }

    #[tokio::test]
    async fn test_remote_reply_screenshots_disabled_skips_fetch() {
        let (formatter, fetcher) = formatter(ReplyOptions {
            show_screenshot: false,
            ..ReplyOptions::default()
        });
        let units = formatter
            .remote_reply(&meta_with(&["https://i/1"]), &Platform::Console)
            .await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        assert!(!units[0].text().unwrap().contains("Screenshots"));
    }

    #[tokio::test]
    async fn test_remote_reply_all_fetches_fail_degrades_to_text() {
        let (formatter, _) = formatter(ReplyOptions {
            send_separately: true,
            ..ReplyOptions::default()
        });
        let units = formatter
            .remote_reply(&meta_with(&["https://i/missing"]), &Platform::Console)
            .await;
        assert_eq!(units.len(), 1);
        assert!(matches!(units[0], ReplyUnit::Text(_)));
    }

    #[test]
    fn test_local_reply_is_single_text_unit() {
        let (formatter, _) = formatter(ReplyOptions::default());
        let meta = LocalMetadata {
            hash: "abc".to_string(),
            name: "x".to_string(),
            trackers: vec![],
            size: Some(1),
        };
        let unit = formatter.local_reply(&meta);
        assert!(matches!(unit, ReplyUnit::Text(ref text) if text.contains("Hash: abc")));
    }

    #[test]
    fn test_image_payload_debug_hides_bytes() {
        let image = ImagePayload {
            source_url: "https://i/1".to_string(),
            mime: SCREENSHOT_MIME,
            bytes: vec![1, 2, 3],
        };
        let rendered = format!("{image:?}");
        assert!(rendered.contains("len: 3"));
    }
}
