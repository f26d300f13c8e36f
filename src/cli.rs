//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Resolve magnet links posted in chat into formatted metadata replies.
///
/// Reads one chat message per line from stdin and prints the replies the
/// resolver would send back.
#[derive(Parser, Debug)]
#[command(name = "magnet-resolver")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to a TOML config file (overrides the default lookup)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Metadata lookup endpoint
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Lookup timeout in milliseconds (1-120000)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=120_000))]
    pub timeout_ms: Option<u64>,

    /// Log raw lookup bodies and decode results
    #[arg(long)]
    pub debug: bool,

    /// Platform identifier attached to console messages
    #[arg(long, default_value = "console")]
    pub platform: String,
}
