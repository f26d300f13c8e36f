//! End-to-end handling of a chat message that may contain a magnet link.
//!
//! [`MagnetPipeline::handle`] runs the ordered steps
//! extract → throttle → placeholder → lookup → classify → format → send,
//! and always retracts the placeholder afterwards, whatever happened in
//! between. [`MagnetPipeline::resolve_link`] is the transport-free core that
//! decides which replies a link produces.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ResolverConfig;
use crate::magnet::{LocalDecoder, MagnetLink, extract_magnet};
use crate::reply::{
    HttpScreenshotFetcher, INCOMPLETE_DATA_NOTICE, RESOLVING_NOTICE, ReplyFormatter, ReplyUnit,
    ScreenshotFetcher, UNRESOLVABLE_NOTICE, service_error_notice, throttled_notice,
    unavailable_notice,
};
use crate::resolver::{Classifier, LookupError, MetadataLookup, RemoteResolver, ResolutionOutcome};
use crate::throttle::{RateLimiter, ThrottleDecision};
use crate::transport::{ChatTransport, InboundMessage, MessageId, Platform, TransportError};

/// What the pipeline did with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// No magnet link; the host should continue with its next handler.
    PassThrough,
    /// A link was found but the throttle rejected the lookup.
    Throttled {
        /// Wait hint sent to the user.
        retry_after_secs: u64,
    },
    /// Replies were produced and sent.
    Replied {
        /// Units in the order they were sent.
        units: Vec<ReplyUnit>,
    },
}

/// Errors that escape the pipeline.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// A reply could not be delivered
    #[error("failed to deliver reply: {0}")]
    Delivery(#[from] TransportError),
}

/// Message handler wiring extractor, throttle, lookup, classifier, local
/// decoder and reply formatter together.
pub struct MagnetPipeline {
    throttle: Arc<RateLimiter>,
    lookup: Arc<dyn MetadataLookup>,
    classifier: Classifier,
    decoder: LocalDecoder,
    formatter: ReplyFormatter,
    use_local_parsing: bool,
    debug_mode: bool,
}

impl MagnetPipeline {
    /// Creates a pipeline from explicit collaborators.
    ///
    /// The throttle is passed in rather than created here so one instance can
    /// be shared by every session of the process.
    #[must_use]
    pub fn new(
        config: &ResolverConfig,
        throttle: Arc<RateLimiter>,
        lookup: Arc<dyn MetadataLookup>,
        fetcher: Arc<dyn ScreenshotFetcher>,
    ) -> Self {
        Self {
            throttle,
            lookup,
            classifier: Classifier::new(&config.classifier_rules()),
            decoder: LocalDecoder::default(),
            formatter: ReplyFormatter::new(config.reply_options(), fetcher),
            use_local_parsing: config.use_local_parsing,
            debug_mode: config.debug_mode,
        }
    }

    /// Creates a pipeline talking HTTP to the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] when the endpoint is invalid or an HTTP client
    /// cannot be built.
    pub fn from_config(
        config: &ResolverConfig,
        throttle: Arc<RateLimiter>,
    ) -> Result<Self, LookupError> {
        let lookup = RemoteResolver::new(&config.api_endpoint, config.timeout(), config.user_agent())?;
        let fetcher = HttpScreenshotFetcher::new(config.user_agent(), config.timeout())?;
        Ok(Self::new(config, throttle, Arc::new(lookup), Arc::new(fetcher)))
    }

    /// Replaces the local decoding strategies.
    #[must_use]
    pub fn with_decoder(mut self, decoder: LocalDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    /// Handles one inbound message end to end.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Delivery`] when a throttle notice or a result
    /// reply cannot be sent. Placeholder send/delete failures are not errors.
    #[tracing::instrument(skip_all, fields(session = %message.session_id, platform = %message.platform))]
    pub async fn handle(
        &self,
        message: &InboundMessage,
        transport: &dyn ChatTransport,
    ) -> Result<Dispatch, PipelineError> {
        let text = message.plain_text();
        let Some(link) = extract_magnet(&text) else {
            return Ok(Dispatch::PassThrough);
        };
        diag!(self.debug_mode, link = %link, "magnet link detected");

        let decision = self.throttle.try_acquire();
        if let ThrottleDecision::Rejected { .. } = decision {
            let retry_after_secs = decision.retry_after_secs();
            info!(retry_after_secs, "lookup throttled");
            transport
                .send(message, &ReplyUnit::Notice(throttled_notice(retry_after_secs)))
                .await?;
            return Ok(Dispatch::Throttled { retry_after_secs });
        }

        let placeholder = match transport
            .send(message, &ReplyUnit::Text(RESOLVING_NOTICE.to_string()))
            .await
        {
            Ok(id) => Some(id),
            Err(error) => {
                warn!(error = %error, "placeholder could not be sent, continuing without it");
                None
            }
        };

        let result = self.resolve_and_deliver(&link, message, transport).await;

        if let Some(id) = placeholder {
            retract_placeholder(transport, message, &id).await;
        }
        result
    }

    async fn resolve_and_deliver(
        &self,
        link: &MagnetLink,
        message: &InboundMessage,
        transport: &dyn ChatTransport,
    ) -> Result<Dispatch, PipelineError> {
        let units = self.resolve_link(link, &message.platform).await;

        for unit in &units {
            if let Err(error) = transport.send(message, unit).await {
                warn!(error = %error, "reply delivery failed");
                let notice = ReplyUnit::Notice(UNRESOLVABLE_NOTICE.to_string());
                if let Err(notice_error) = transport.send(message, &notice).await {
                    debug!(error = %notice_error, "failure notice could not be sent either");
                }
                return Err(error.into());
            }
        }

        info!(units = units.len(), "magnet link resolved");
        Ok(Dispatch::Replied { units })
    }

    /// Resolves `link` into replies without sending anything.
    ///
    /// Never fails: every outcome, including transport errors, maps to a
    /// reply list of at least one unit.
    #[tracing::instrument(skip(self, link), fields(lookup = self.lookup.name()))]
    pub async fn resolve_link(&self, link: &MagnetLink, platform: &Platform) -> Vec<ReplyUnit> {
        let outcome = match self.lookup.lookup(link).await {
            Ok(body) => {
                diag!(self.debug_mode, body = %body, "lookup response body");
                self.classifier.classify(&body)
            }
            Err(error) => {
                warn!(error = %error, "lookup failed, treating as service outage");
                return self.fallback(link, None);
            }
        };
        debug!(outcome = outcome.kind(), "lookup classified");

        match outcome {
            ResolutionOutcome::Success(meta) => {
                diag!(
                    self.debug_mode,
                    name = %meta.name,
                    size = meta.size,
                    count = meta.count,
                    screenshots = meta.screenshots.len(),
                    "remote metadata accepted"
                );
                self.formatter.remote_reply(&meta, platform).await
            }
            ResolutionOutcome::QuotaError(reason) => {
                info!(reason = %reason, "lookup refused by quota");
                self.fallback(link, Some(&reason))
            }
            ResolutionOutcome::OtherError(reason) => {
                info!(reason = %reason, "lookup service reported an error");
                vec![ReplyUnit::Notice(service_error_notice(&reason))]
            }
            ResolutionOutcome::Malformed => {
                info!("lookup response incomplete");
                vec![ReplyUnit::Notice(INCOMPLETE_DATA_NOTICE.to_string())]
            }
        }
    }

    /// Degraded path for quota refusals and transport failures.
    fn fallback(&self, link: &MagnetLink, reason: Option<&str>) -> Vec<ReplyUnit> {
        if !self.use_local_parsing {
            return vec![ReplyUnit::Notice(unavailable_notice(reason))];
        }

        match self.decoder.decode(link.as_str()) {
            Some(meta) => {
                diag!(
                    self.debug_mode,
                    hash = %meta.hash,
                    name = %meta.name,
                    size = ?meta.size,
                    trackers = meta.trackers.len(),
                    "local decode result"
                );
                vec![self.formatter.local_reply(&meta)]
            }
            None => {
                warn!("local decode exhausted every strategy");
                vec![ReplyUnit::Notice(UNRESOLVABLE_NOTICE.to_string())]
            }
        }
    }
}

impl std::fmt::Debug for MagnetPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MagnetPipeline")
            .field("lookup", &self.lookup.name())
            .field("decoder", &self.decoder)
            .field("formatter", &self.formatter)
            .field("use_local_parsing", &self.use_local_parsing)
            .field("debug_mode", &self.debug_mode)
            .finish_non_exhaustive()
    }
}

/// Deletes the placeholder; it may already be gone, so failures are ignored.
async fn retract_placeholder(
    transport: &dyn ChatTransport,
    message: &InboundMessage,
    id: &MessageId,
) {
    if let Err(error) = transport.delete(message, id).await {
        debug!(error = %error, "placeholder delete failed");
    }
}
