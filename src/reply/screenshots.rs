//! Screenshot retrieval for remote replies.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, warn};

use crate::resolver::{LookupError, build_http_client};

use super::ImagePayload;

/// Screenshots larger than this are dropped instead of forwarded to chat.
pub const MAX_SCREENSHOT_BYTES: usize = 10 * 1024 * 1024;

/// Content type attached to every screenshot.
///
/// The lookup service has only been observed serving JPEG previews; the
/// served `Content-Type` is not consulted.
pub const SCREENSHOT_MIME: &str = "image/jpeg";

/// Errors from a single screenshot fetch.
#[derive(Debug, Clone, Error)]
#[error("screenshot fetch failed for '{url}': {reason}")]
pub struct FetchError {
    /// Screenshot URL
    pub url: String,
    /// Why the fetch failed
    pub reason: String,
}

impl FetchError {
    /// Creates a fetch error.
    #[must_use]
    pub fn new(url: &str, reason: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}

/// Retrieves screenshot images.
#[async_trait]
pub trait ScreenshotFetcher: Send + Sync {
    /// Downloads one screenshot.
    async fn fetch(&self, url: &str) -> Result<ImagePayload, FetchError>;
}

/// Fetches every URL concurrently, keeping list order and dropping failures.
///
/// A failed image is logged and skipped; it never fails the whole reply.
pub async fn fetch_all(fetcher: &dyn ScreenshotFetcher, urls: &[String]) -> Vec<ImagePayload> {
    let results = join_all(urls.iter().map(|url| fetcher.fetch(url))).await;
    let images: Vec<ImagePayload> = results
        .into_iter()
        .filter_map(|result| match result {
            Ok(image) => Some(image),
            Err(error) => {
                warn!(url = %error.url, reason = %error.reason, "screenshot dropped");
                None
            }
        })
        .collect();
    debug!(
        requested = urls.len(),
        fetched = images.len(),
        "screenshot fetch finished"
    );
    images
}

/// HTTP implementation of [`ScreenshotFetcher`].
pub struct HttpScreenshotFetcher {
    client: Client,
}

impl HttpScreenshotFetcher {
    /// Creates a fetcher sharing the lookup's identity and timeout.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::ClientBuild`] when the HTTP client cannot be built.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, LookupError> {
        Ok(Self {
            client: build_http_client(user_agent, timeout)?,
        })
    }
}

impl std::fmt::Debug for HttpScreenshotFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpScreenshotFetcher").finish_non_exhaustive()
    }
}

#[async_trait]
impl ScreenshotFetcher for HttpScreenshotFetcher {
    #[tracing::instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<ImagePayload, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|error| FetchError::new(url, error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(url, format!("HTTP {}", status.as_u16())));
        }
        if let Some(length) = response.content_length()
            && length > MAX_SCREENSHOT_BYTES as u64
        {
            return Err(FetchError::new(url, format!("image too large ({length} bytes)")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|error| FetchError::new(url, error.to_string()))?;
        if bytes.is_empty() {
            return Err(FetchError::new(url, "empty image body"));
        }
        if bytes.len() > MAX_SCREENSHOT_BYTES {
            return Err(FetchError::new(
                url,
                format!("image too large ({} bytes)", bytes.len()),
            ));
        }

        Ok(ImagePayload {
            source_url: url.to_string(),
            mime: SCREENSHOT_MIME,
            bytes: bytes.to_vec(),
        })
    }
}
