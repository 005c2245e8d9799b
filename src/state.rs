//! Application state management

use crate::config::Settings;
use crate::db::SqliteDb;
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;

/// Application state shared by every caller of the store
pub struct AppState {
    /// Settings the store was opened with
    pub settings: Settings,

    /// SQLite reference data store
    pub sqlite: Arc<SqliteDb>,
}

impl AppState {
    /// Create new application state from explicit settings
    pub fn new(settings: Settings) -> Result<Self> {
        let location = settings.store_location()?;

        tracing::info!("Binding store ({:?}): {:?}", settings.env, location);

        let sqlite = Arc::new(SqliteDb::open(
            &location,
            Duration::from_millis(settings.busy_timeout_ms),
        )?);

        Ok(Self { settings, sqlite })
    }

    /// Create application state from the process environment
    pub fn from_env() -> Result<Self> {
        Self::new(Settings::from_env()?)
    }
}
