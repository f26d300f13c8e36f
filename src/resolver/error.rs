//! Error types for remote metadata lookups.
//!
//! Every variant is a transport-level failure: the service could not be asked
//! or did not answer with a usable HTTP response. Service-level refusals
//! (quota messages, malformed bodies) are not errors here; they are
//! classified into [`super::ResolutionOutcome`] instead.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while querying the metadata service.
#[derive(Debug, Clone, Error)]
pub enum LookupError {
    /// The configured endpoint is not a usable http(s) URL
    #[error("invalid lookup endpoint '{endpoint}': {reason}")]
    InvalidEndpoint {
        /// The configured endpoint
        endpoint: String,
        /// Why it was rejected
        reason: String,
    },

    /// The HTTP client could not be constructed
    #[error("HTTP client construction failed: {reason}")]
    ClientBuild {
        /// Underlying builder error
        reason: String,
    },

    /// The request did not complete within the configured timeout
    #[error("lookup timed out after {}ms", timeout.as_millis())]
    Timeout {
        /// The timeout that elapsed
        timeout: Duration,
    },

    /// The service could not be reached
    #[error("lookup request failed: {reason}")]
    Network {
        /// Underlying transport error
        reason: String,
    },

    /// The service answered with a non-2xx status
    #[error("lookup service returned HTTP {status}")]
    HttpStatus {
        /// Response status code
        status: u16,
    },

    /// The response body could not be read
    #[error("lookup response body could not be read: {reason}")]
    Body {
        /// Underlying read error
        reason: String,
    },
}

impl LookupError {
    /// Creates an `InvalidEndpoint` error.
    #[must_use]
    pub fn invalid_endpoint(endpoint: &str, reason: &str) -> Self {
        Self::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Maps a `reqwest` send error, separating timeouts from other failures.
    #[must_use]
    pub fn from_send(error: &reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            Self::Timeout { timeout }
        } else {
            Self::Network {
                reason: error.to_string(),
            }
        }
    }

    /// Returns true for timeouts.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
