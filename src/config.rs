//! Store configuration
//!
//! Settings are read once at startup (environment variables, optionally
//! seeded from a `.env` file) and handed to [`crate::state::AppState`].

use crate::error::{AppError, Result};
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/refdata.db";
const DEFAULT_TEST_DATABASE_URL: &str = "sqlite::memory:";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Test,
    Prod,
}

impl FromStr for Environment {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Dev),
            "test" => Ok(Environment::Test),
            "prod" | "production" => Ok(Environment::Prod),
            other => Err(AppError::Config(format!("Unknown environment: {}", other))),
        }
    }
}

/// Application settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub env: Environment,
    /// Production store URI (e.g., "sqlite://data/refdata.db")
    pub database_url: String,
    /// Ephemeral store URI used when `env` is `Test`
    pub test_database_url: String,
    /// How long a writer waits on a locked database file
    pub busy_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            env: Environment::Dev,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            test_database_url: DEFAULT_TEST_DATABASE_URL.to_string(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl Settings {
    /// Load from environment variables, reading `.env` first if present
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(AppError::Config(format!("Failed to load .env: {}", e)));
            }
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = match lookup("APP_ENV") {
            Some(value) => value.parse()?,
            None => Environment::Dev,
        };

        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let test_database_url = lookup("SQLITE_TEST_DATABASE_URI")
            .unwrap_or_else(|| DEFAULT_TEST_DATABASE_URL.to_string());

        let busy_timeout_ms = match lookup("DATABASE_BUSY_TIMEOUT_MS") {
            Some(value) => value.trim().parse().map_err(|_| {
                AppError::Config(format!("Invalid DATABASE_BUSY_TIMEOUT_MS: {}", value))
            })?,
            None => DEFAULT_BUSY_TIMEOUT_MS,
        };

        Ok(Self {
            env,
            database_url,
            test_database_url,
            busy_timeout_ms,
        })
    }

    /// Store URI for the current environment
    pub fn database_url(&self) -> &str {
        match self.env {
            Environment::Test => &self.test_database_url,
            Environment::Dev | Environment::Prod => &self.database_url,
        }
    }

    /// Parsed store location for the current environment
    pub fn store_location(&self) -> Result<StoreLocation> {
        StoreLocation::parse(self.database_url())
    }
}

/// Where the SQLite store lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Memory,
    File(PathBuf),
}

impl StoreLocation {
    /// Parse a store URI
    ///
    /// Accepts `sqlite::memory:`, `:memory:`, `sqlite://<path>`,
    /// `sqlite:<path>` and bare filesystem paths.
    pub fn parse(url: &str) -> Result<Self> {
        let url = url.trim();
        if url.is_empty() {
            return Err(AppError::Config("Empty database URL".to_string()));
        }

        let path = if let Some(rest) = url.strip_prefix("sqlite://") {
            rest
        } else if let Some(rest) = url.strip_prefix("sqlite:") {
            rest
        } else if url.contains("://") {
            return Err(AppError::Config(format!("Unsupported database URL: {}", url)));
        } else {
            url
        };

        match path {
            "" => Err(AppError::Config(format!("Missing database path in URL: {}", url))),
            ":memory:" => Ok(StoreLocation::Memory),
            _ => Ok(StoreLocation::File(PathBuf::from(path))),
        }
    }
}
