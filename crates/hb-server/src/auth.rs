//! Bearer-token authentication for the API routes.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::ApiError;
use crate::state::AppState;

/// Rejects requests whose `Authorization: Bearer <token>` header does not
/// match the configured token. Runs before the handler, so a rejected
/// request mutates nothing.
pub async fn require_bearer(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match presented {
        Some(token) if token == state.config.bearer_token => Ok(next.run(request).await),
        _ => Err(ApiError::Unauthorized),
    }
}
