//! Application state management

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::Authenticator;
use crate::config::Config;
use crate::storage::NameGenerator;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    db: SqlitePool,
    auth: Authenticator,
    names: NameGenerator,
    base_url: String,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: Config, db: SqlitePool) -> Self {
        let auth = Authenticator::from_config(&config.auth);
        let names = NameGenerator::new(config.storage.filename_length);
        let base_url = config.server.base_url();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                auth,
                names,
                base_url,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the database pool
    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    pub fn auth(&self) -> &Authenticator {
        &self.inner.auth
    }

    /// Generator for file names and short codes
    pub fn names(&self) -> NameGenerator {
        self.inner.names
    }

    /// Public base URL used in returned links
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }
}
