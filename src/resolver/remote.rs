//! HTTP implementation of [`MetadataLookup`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::magnet::MagnetLink;

use super::http_client::build_http_client;
use super::{LookupError, MetadataLookup};

/// Queries a whatslink-style metadata service: `GET <endpoint>?url=<magnet>`.
pub struct RemoteResolver {
    client: Client,
    endpoint: Url,
    timeout: Duration,
}

impl RemoteResolver {
    /// Creates a resolver for `endpoint` with the given timeout and user agent.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] when the endpoint is not an http(s) URL or the
    /// HTTP client cannot be built.
    #[tracing::instrument(skip(user_agent), fields(timeout_ms = timeout.as_millis()))]
    pub fn new(endpoint: &str, timeout: Duration, user_agent: &str) -> Result<Self, LookupError> {
        let parsed = Url::parse(endpoint)
            .map_err(|error| LookupError::invalid_endpoint(endpoint, &error.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(LookupError::invalid_endpoint(
                endpoint,
                "scheme must be http or https",
            ));
        }

        Ok(Self {
            client: build_http_client(user_agent, timeout)?,
            endpoint: parsed,
            timeout,
        })
    }

    /// Returns the configured endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    fn request_url(&self, link: &MagnetLink) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("url", link.as_str());
        url
    }
}

impl std::fmt::Debug for RemoteResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteResolver")
            .field("endpoint", &self.endpoint.as_str())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MetadataLookup for RemoteResolver {
    fn name(&self) -> &'static str {
        "remote"
    }

    #[tracing::instrument(skip(self, link), fields(endpoint = %self.endpoint))]
    async fn lookup(&self, link: &MagnetLink) -> Result<Value, LookupError> {
        let response = self
            .client
            .get(self.request_url(link))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|error| LookupError::from_send(&error, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let text = response.text().await.map_err(|error| {
            if error.is_timeout() {
                LookupError::Timeout {
                    timeout: self.timeout,
                }
            } else {
                LookupError::Body {
                    reason: error.to_string(),
                }
            }
        })?;
        debug!(body_len = text.len(), "lookup response received");

        Ok(parse_body(&text))
    }
}

/// Parses a response body leniently: empty text is `Null`, non-JSON text is
/// kept as a string so the classifier can reject it.
fn parse_body(text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string()))
}
