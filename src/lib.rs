//! Equity Reference Data Store
//!
//! Companies, their listed equities, the trading calendar and end-of-day
//! prices, persisted in SQLite. Every create runs in its own transaction and
//! is validated against the current contents of the store.

pub mod config;
pub mod db;
pub mod error;
pub mod state;

pub use config::{Environment, Settings, StoreLocation};
pub use db::sqlite::models::{
    Company, CompanyStatus, Country, Equity, EquityEodPrice, NewCompany, NewEodPrice, NewEquity,
    NewTradingDay, TradingDay, TradingStatus,
};
pub use db::SqliteDb;
pub use error::{AppError, Result};
pub use state::AppState;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging
///
/// Honors `RUST_LOG`; safe to call more than once.
pub fn init_tracing() {
    let initialized = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "equity_refdata=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    if initialized.is_ok() {
        tracing::info!("Tracing initialized");
    }
}
