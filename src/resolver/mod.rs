//! Remote metadata lookup and response classification.
//!
//! # Architecture
//!
//! - [`MetadataLookup`] - async trait for services that describe a magnet link
//! - [`RemoteResolver`] - HTTP implementation (`GET <endpoint>?url=<magnet>`)
//! - [`Classifier`] - turns the untrusted body into a [`ResolutionOutcome`]
//! - [`LookupError`] - transport failures, surfaced to the pipeline unclassified
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use magnet_resolver_core::magnet::MagnetLink;
//! use magnet_resolver_core::resolver::{Classifier, MetadataLookup, RemoteResolver};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = RemoteResolver::new(
//!     "https://whatslink.info/api/v1/link",
//!     Duration::from_secs(10),
//!     "magnet-resolver-example",
//! )?;
//! let link = MagnetLink::parse("magnet:?xt=urn:btih:dd8255ecdc7ca55fb0bbf81323d87062db1f6d1c")
//!     .ok_or("not a magnet link")?;
//! let body = resolver.lookup(&link).await?;
//! println!("{:?}", Classifier::default().classify(&body));
//! # Ok(())
//! # }
//! ```

mod classify;
mod error;
mod http_client;
mod remote;

pub use classify::{
    Classifier, ClassifierRules, DEFAULT_QUOTA_KEYWORDS, DEFAULT_THROTTLE_NAME_KEYWORDS, FileType,
    RemoteMetadata, ResolutionOutcome,
};
pub use error::LookupError;
pub use http_client::build_http_client;
pub use remote::RemoteResolver;

use async_trait::async_trait;
use serde_json::Value;

use crate::magnet::MagnetLink;

/// A service that returns raw metadata for a magnet link.
///
/// # Object Safety
///
/// This trait uses `async_trait` so the pipeline can hold an
/// `Arc<dyn MetadataLookup>` and tests can inject fakes.
#[async_trait]
pub trait MetadataLookup: Send + Sync {
    /// Returns the lookup's name for logging.
    fn name(&self) -> &str;

    /// Fetches the raw response body for `link`.
    ///
    /// Transport failures (timeout, connection, non-2xx) are errors; anything
    /// the service actually answered is returned for classification.
    async fn lookup(&self, link: &MagnetLink) -> Result<Value, LookupError>;
}
