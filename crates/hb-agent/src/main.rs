use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hb_agent::{AgentConfig, Cli, HeartbeatClient};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let mut config =
        AgentConfig::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(device_id) = cli.device_id {
        config.device_id = device_id;
    }
    tracing::debug!(?config, "loaded configuration");

    let client = HeartbeatClient::new(&config).context("failed to build client")?;

    // Exit code 0/1 is the contract with the OS scheduler.
    if cli.test {
        match client.check_health().await {
            Ok(()) => {
                tracing::info!(server_url = %config.server_url, "connection successful");
                Ok(ExitCode::SUCCESS)
            }
            Err(err) => {
                tracing::error!(error = %err, "connection failed");
                Ok(ExitCode::FAILURE)
            }
        }
    } else {
        match client.send_heartbeat().await {
            Ok(()) => {
                tracing::info!(device_id = %config.device_id, "heartbeat sent");
                Ok(ExitCode::SUCCESS)
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to send heartbeat");
                Ok(ExitCode::FAILURE)
            }
        }
    }
}
