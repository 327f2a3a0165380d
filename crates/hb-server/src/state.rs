//! Shared server state.

use std::sync::{Arc, Mutex, MutexGuard};

use hb_db::Database;

use crate::config::ServerConfig;
use crate::error::ApiError;

/// State shared across request handlers.
///
/// `rusqlite::Connection` is `Send` but not `Sync`, so the database sits
/// behind a `Mutex`; each handler holds the lock only for its own
/// read-modify-write and never across an await point.
pub struct AppState {
    db: Mutex<Database>,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> Arc<Self> {
        Arc::new(Self {
            db: Mutex::new(db),
            config,
        })
    }

    /// Locks the database for one handler's work.
    pub fn db(&self) -> Result<MutexGuard<'_, Database>, ApiError> {
        self.db.lock().map_err(|_| ApiError::LockPoisoned)
    }
}
