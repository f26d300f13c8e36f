//! Console host for the magnet resolver.
//!
//! Every stdin line is treated as one chat message; replies are printed to
//! stdout the way a chat platform would render them.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use magnet_resolver_core::reply::Delivery;
use magnet_resolver_core::{
    ChatTransport, Dispatch, InboundMessage, MagnetPipeline, MessageId, Platform, RateLimiter,
    ReplyUnit, TransportError,
};

mod app_config;
mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let loaded = app_config::load_config(args.config.as_deref())?;
    let mut config = loaded.config;
    if let Some(endpoint) = args.endpoint {
        config.api_endpoint = endpoint;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    config.debug_mode |= args.debug;
    config.validate().context("Invalid resolver configuration")?;

    info!(
        config_path = ?loaded.path,
        from_file = loaded.loaded_from_file,
        endpoint = %config.api_endpoint,
        "Magnet resolver starting"
    );

    let throttle = Arc::new(RateLimiter::new(config.min_interval()));
    let pipeline = MagnetPipeline::from_config(&config, throttle)
        .context("Failed to initialise metadata lookup")?;
    let platform = Platform::from_id(&args.platform);
    let transport = ConsoleTransport::default();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_number = 0_u64;
    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        let mut message = InboundMessage::text("console", platform.clone(), line);
        message.message_id = Some(format!("in-{line_number}"));

        match pipeline.handle(&message, &transport).await {
            Ok(Dispatch::PassThrough) => debug!(line_number, "no magnet link"),
            Ok(Dispatch::Throttled { retry_after_secs }) => {
                debug!(line_number, retry_after_secs, "throttled");
            }
            Ok(Dispatch::Replied { units }) => debug!(line_number, units = units.len(), "replied"),
            Err(error) => warn!(line_number, error = %error, "message handling failed"),
        }
    }

    info!("Input exhausted, exiting");
    Ok(())
}

/// Prints replies to stdout; images are summarised rather than dumped.
#[derive(Debug, Default)]
struct ConsoleTransport {
    next_id: AtomicU64,
}

#[async_trait]
impl ChatTransport for ConsoleTransport {
    async fn send(
        &self,
        _origin: &InboundMessage,
        unit: &ReplyUnit,
    ) -> Result<MessageId, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        match unit {
            ReplyUnit::Text(text) | ReplyUnit::Notice(text) => println!("{text}"),
            ReplyUnit::Image(image) => {
                println!("[image {} bytes from {}]", image.bytes.len(), image.source_url);
            }
            ReplyUnit::Composite {
                text,
                images,
                delivery,
            } => {
                if *delivery == Delivery::Forward {
                    println!("--- forwarded ---");
                }
                println!("{text}");
                for image in images {
                    println!("[image {} bytes from {}]", image.bytes.len(), image.source_url);
                }
            }
        }
        Ok(MessageId(format!("out-{id}")))
    }

    async fn delete(&self, _origin: &InboundMessage, id: &MessageId) -> Result<(), TransportError> {
        debug!(message_id = %id.0, "retracted");
        Ok(())
    }
}
