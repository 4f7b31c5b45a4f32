//! Shared application state.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::Config;
use crate::database::Database;
use crate::rate_limit::RateLimiter;

/// Shared application state available to all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<Config>,

    /// Per-client request limiter.
    pub limiter: RateLimiter,

    /// Database handle. Empty until the deferred connect succeeds, and
    /// stays empty when it fails.
    database: Arc<RwLock<Option<Database>>>,
}

impl AppState {
    /// Create a new application state from configuration.
    pub fn new(config: Config) -> Self {
        let limiter = RateLimiter::new(config.rate_limit_max, config.rate_limit_window);
        Self {
            config: Arc::new(config),
            limiter,
            database: Arc::new(RwLock::new(None)),
        }
    }

    /// The database handle, if the deferred connect has succeeded.
    pub fn database(&self) -> Option<Database> {
        self.database.read().clone()
    }

    /// Install the database handle after a successful connect.
    pub fn set_database(&self, database: Database) {
        *self.database.write() = Some(database);
    }
}
