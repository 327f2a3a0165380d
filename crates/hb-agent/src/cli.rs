//! Command-line argument definitions.

use std::path::PathBuf;

use clap::Parser;

/// Heartbeat agent for the attendance tracker.
///
/// Posts one authenticated heartbeat per invocation; schedule it once per
/// minute with cron or an equivalent.
#[derive(Debug, Parser)]
#[command(name = "hb-agent", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Check connectivity against the server's health endpoint and exit.
    #[arg(long)]
    pub test: bool,

    /// Override the configured device id.
    #[arg(long)]
    pub device_id: Option<String>,
}
