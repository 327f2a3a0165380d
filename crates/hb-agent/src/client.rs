//! HTTP client for posting heartbeats to the attendance server.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AgentConfig;

/// Agent client errors.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The configured bearer token was unusable.
    #[error("invalid bearer token: {reason}")]
    InvalidToken { reason: &'static str },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The server answered with a non-success status.
    #[error("server returned status {status}: {message}")]
    Rejected { status: u16, message: String },
}

/// Heartbeat client.
///
/// # Thread Safety
///
/// The client is safe to clone and share across threads. Each clone shares
/// the underlying HTTP connection pool.
pub struct HeartbeatClient {
    http: reqwest::Client,
    base_url: String,
    bearer_token: String,
    device_id: String,
    timezone: String,
}

impl fmt::Debug for HeartbeatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeartbeatClient")
            .field("base_url", &self.base_url)
            .field("device_id", &self.device_id)
            .field("bearer_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct HeartbeatPayload<'a> {
    device_id: &'a str,
    timezone: &'a str,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: String,
    #[serde(default)]
    message: String,
}

impl HeartbeatClient {
    /// Creates a client from the agent configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the bearer token is empty or whitespace-only, or
    /// if the HTTP client fails to build.
    pub fn new(config: &AgentConfig) -> Result<Self, AgentError> {
        if config.bearer_token.is_empty() {
            return Err(AgentError::InvalidToken {
                reason: "bearer token cannot be empty; set HB_BEARER_TOKEN",
            });
        }
        if config.bearer_token.trim().is_empty() {
            return Err(AgentError::InvalidToken {
                reason: "bearer token cannot be whitespace-only",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(AgentError::ClientBuild)?;

        Ok(Self {
            http,
            base_url: config.server_url.trim_end_matches('/').to_string(),
            bearer_token: config.bearer_token.clone(),
            device_id: config.device_id.clone(),
            timezone: config.timezone.clone(),
        })
    }

    /// Posts one heartbeat minute.
    pub async fn send_heartbeat(&self) -> Result<(), AgentError> {
        let payload = HeartbeatPayload {
            device_id: &self.device_id,
            timezone: &self.timezone,
        };

        let response = self
            .http
            .post(format!("{}/api/heartbeat", self.base_url))
            .bearer_auth(&self.bearer_token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AgentError::Rejected {
                status: status.as_u16(),
                message: parse_detail(&body).unwrap_or(body),
            });
        }

        if let Ok(parsed) = serde_json::from_str::<StatusBody>(&body) {
            tracing::debug!(status = %parsed.status, message = %parsed.message, "server reply");
        }
        Ok(())
    }

    /// Checks connectivity against the unauthenticated health endpoint.
    pub async fn check_health(&self) -> Result<(), AgentError> {
        let response = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::Rejected {
                status: status.as_u16(),
                message: "health check failed".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_detail(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorPayload {
        detail: String,
    }

    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .map(|payload| payload.detail)
}
