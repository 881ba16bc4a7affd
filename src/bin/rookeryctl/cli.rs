use clap::{Parser, Subcommand};
use std::path::PathBuf;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_SHA"),
    ", built ",
    env!("VERGEN_BUILD_TIMESTAMP"),
    ", rustc ",
    env!("VERGEN_RUSTC_SEMVER"),
    ")"
);

#[derive(Parser)]
#[command(name = "rookeryctl")]
#[command(version, long_version = LONG_VERSION)]
#[command(about = "Inspect and replay the market data dead letter queue", long_about = None)]
pub struct Cli {
    /// Directory holding persisted dead letter records (default ./dlq)
    #[arg(long, value_name = "DIR")]
    pub storage_path: Option<PathBuf>,

    /// Configuration file (TOML). Falls back to config/default.toml.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL", value_parser = ["trace", "debug", "info", "warn", "error"])]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List dead letter messages
    List {
        /// Only show messages from this channel
        #[arg(long)]
        channel: Option<String>,
    },
    /// Show aggregate counters and failure breakdowns
    Stats,
    /// Report the current state of one message pending replay
    Replay {
        /// Caller-assigned message id
        message_id: String,
    },
    /// Report the current state of every message on a channel
    ReplayChannel {
        /// Logical topic the messages belonged to
        channel: String,
    },
    /// Report exhausted messages awaiting retention cleanup
    Clear,
}
