//! Magnet Resolver Core Library
//!
//! Detects magnet links in chat messages, resolves them to human-readable
//! torrent metadata through a remote lookup service, and falls back to
//! decoding the link locally when the service is out of quota or
//! unreachable.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`magnet`] - Magnet link extraction and local decoding strategies
//! - [`throttle`] - Process-wide minimum-interval rate limiter
//! - [`resolver`] - Remote lookup and response classification
//! - [`reply`] - Reply text, screenshot fetching and delivery shapes
//! - [`transport`] - Chat host abstraction (messages, platforms, send/delete)
//! - [`pipeline`] - Per-message orchestration with placeholder cleanup
//! - [`config`] - Resolver settings loaded from TOML

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Target for diagnostics emitted only when `debug_mode` is on.
pub const DIAG_TARGET: &str = "magnet_resolver::diag";

/// Logs at info level under [`DIAG_TARGET`] when the flag is set.
macro_rules! diag {
    ($enabled:expr, $($arg:tt)+) => {
        if $enabled {
            tracing::info!(target: "magnet_resolver::diag", $($arg)+);
        }
    };
}

pub mod config;
pub mod magnet;
pub mod pipeline;
pub mod reply;
pub mod resolver;
pub mod throttle;
pub mod transport;
pub mod user_agent;

// Re-export commonly used types
pub use config::{ConfigError, ResolverConfig};
pub use magnet::{LocalDecoder, LocalMetadata, MagnetLink, extract_magnet};
pub use pipeline::{Dispatch, MagnetPipeline, PipelineError};
pub use reply::{ReplyFormatter, ReplyOptions, ReplyUnit};
pub use resolver::{
    Classifier, LookupError, MetadataLookup, RemoteMetadata, RemoteResolver, ResolutionOutcome,
};
pub use throttle::{RateLimiter, ThrottleDecision};
pub use transport::{ChatTransport, InboundMessage, MessageId, Platform, TransportError};
