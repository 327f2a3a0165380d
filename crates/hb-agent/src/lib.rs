//! Heartbeat agent library.
//!
//! The agent is invoked once per minute by an OS scheduler (cron, Task
//! Scheduler); each invocation posts a single authenticated heartbeat and
//! exits 0 on success or 1 on failure.

mod cli;
mod client;
mod config;

pub use cli::Cli;
pub use client::{AgentError, HeartbeatClient};
pub use config::AgentConfig;
