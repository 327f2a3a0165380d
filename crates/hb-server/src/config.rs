//! Server configuration loading.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Token value shipped in the defaults; startup warns until it is replaced.
pub const PLACEHOLDER_TOKEN: &str = "change-me";

/// Server configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to bind on all interfaces.
    pub port: u16,
    /// Static bearer token expected on `/api/*` requests.
    pub bearer_token: String,
    /// Path to the SQLite database file.
    pub database_path: PathBuf,
    /// Device id used when self-healing a missing settings row.
    pub device_id: String,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("port", &self.port)
            .field("bearer_token", &"[REDACTED]")
            .field("database_path", &self.database_path)
            .field("device_id", &self.device_id)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            port: 8000,
            bearer_token: PLACEHOLDER_TOKEN.to_string(),
            database_path: data_dir.join("hb.db"),
            device_id: short_hostname(),
        }
    }
}

impl ServerConfig {
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
            figment = figment.merge(Toml::file(config_dir.join("server.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (HB_*)
        figment = figment.merge(Env::prefixed("HB_"));

        figment.extract()
    }

    /// Whether the bearer token is still the shipped placeholder.
    #[must_use]
    pub fn has_placeholder_token(&self) -> bool {
        self.bearer_token == PLACEHOLDER_TOKEN
    }
}

/// Returns the platform-specific config directory for hb.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("hb"))
}

/// Returns the platform-specific data directory for hb.
///
/// On Linux: `~/.local/share/hb`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("hb"))
}

/// The host's name up to the first dot, or "default" when unavailable.
#[must_use]
pub fn short_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .and_then(|name| name.split('.').next().map(str::to_string))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "default".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_data_dir_for_db() {
        let config = ServerConfig::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("hb.db"));
    }

    #[test]
    fn default_token_is_flagged() {
        let mut config = ServerConfig::default();
        assert!(config.has_placeholder_token());
        config.bearer_token = "secret".to_string();
        assert!(!config.has_placeholder_token());
    }

    #[test]
    fn debug_redacts_the_token() {
        let config = ServerConfig {
            bearer_token: "very-secret".to_string(),
            ..ServerConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("very-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn short_hostname_is_nonempty() {
        assert!(!short_hostname().is_empty());
    }
}
