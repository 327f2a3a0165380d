//! Agent configuration loading.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Agent configuration.
///
/// The bearer token has no usable default; [`crate::HeartbeatClient::new`]
/// rejects an empty token before any request is made.
#[derive(Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Base URL of the attendance server.
    pub server_url: String,
    /// Static bearer token expected by the server.
    pub bearer_token: String,
    /// Device identifier reported with each heartbeat.
    pub device_id: String,
    /// IANA timezone name reported with each heartbeat.
    pub timezone: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentConfig")
            .field("server_url", &self.server_url)
            .field("bearer_token", &"[REDACTED]")
            .field("device_id", &self.device_id)
            .field("timezone", &self.timezone)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8000".to_string(),
            bearer_token: String::new(),
            device_id: short_hostname(),
            timezone: iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string()),
            timeout_secs: 10,
        }
    }
}

impl AgentConfig {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("agent.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (HB_*), shared with the server
        figment = figment.merge(Env::prefixed("HB_"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for hb.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("hb"))
}

/// The host's name up to the first dot, or "default" when unavailable.
fn short_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .and_then(|name| name.split('.').next().map(str::to_string))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "default".to_string())
}
