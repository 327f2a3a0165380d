//! HTTP server for the heartbeat attendance tracker.
//!
//! Routes:
//! - `POST /api/heartbeat`, `GET|POST /api/settings`, `GET|POST /api/holidays`,
//!   `DELETE /api/holidays/{date}`, `GET|POST /api/corrections`,
//!   `DELETE /api/corrections/{date}` - bearer-token authenticated JSON API
//! - `GET /health` - unauthenticated liveness probe
//! - `GET /dashboard`, `GET|POST /settings`, `POST /holidays`,
//!   `POST /holidays/{date}/delete` - HTML pages and their form posts

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::middleware;
use axum::routing::{delete, get, post};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod config;
pub mod error;
pub mod pages;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use state::AppState;

use hb_db::Database;

/// Builds the application router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/heartbeat", post(routes::record_heartbeat))
        .route(
            "/settings",
            get(routes::get_settings).post(routes::update_settings),
        )
        .route(
            "/holidays",
            get(routes::list_holidays).post(routes::add_holiday),
        )
        .route("/holidays/{date}", delete(routes::delete_holiday))
        .route(
            "/corrections",
            get(routes::list_corrections).post(routes::set_correction),
        )
        .route("/corrections/{date}", delete(routes::delete_correction))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    Router::new()
        .nest("/api", api)
        .route("/health", get(routes::health))
        .route("/", get(pages::index))
        .route("/dashboard", get(pages::dashboard))
        .route(
            "/settings",
            get(pages::settings_page).post(pages::update_settings_form),
        )
        .route("/holidays", post(pages::add_holiday_form))
        .route("/holidays/{date}/delete", post(pages::delete_holiday_form))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Opens the database and serves until ctrl-c/SIGTERM.
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    if config.has_placeholder_token() {
        tracing::warn!("bearer token is the shipped placeholder; set HB_BEARER_TOKEN");
    }

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    let db = Database::open(&config.database_path).context("failed to open database")?;

    let address = format!("0.0.0.0:{}", config.port);
    let state = AppState::new(db, config);
    let app = router(state);

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    tracing::info!(%address, "server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install ctrl-c handler");
            std::future::pending::<()>().await;
        }
        tracing::info!("received ctrl-c, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("received terminate signal, shutting down");
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
