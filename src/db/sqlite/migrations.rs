//! SQLite database migrations

use crate::error::Result;
use rusqlite::Connection;

/// Run all database migrations
pub fn run_migrations(conn: &Connection) -> Result<()> {
    // Create migrations table
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    // Run each migration
    run_migration(conn, "001_companies", CREATE_COMPANIES_TABLE)?;
    run_migration(conn, "002_equities", CREATE_EQUITIES_TABLE)?;
    run_migration(conn, "003_trading_days", CREATE_TRADING_DAYS_TABLE)?;
    run_migration(conn, "004_equity_eod_prices", CREATE_EQUITY_EOD_PRICES_TABLE)?;

    tracing::info!("Database migrations completed");
    Ok(())
}

fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<()> {
    // Check if migration already applied
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM migrations WHERE name = ?)",
        [name],
        |row| row.get(0),
    )?;

    if !exists {
        tracing::info!("Running migration: {}", name);
        conn.execute_batch(sql)?;
        conn.execute("INSERT INTO migrations (name) VALUES (?)", [name])?;
    }

    Ok(())
}

// Timestamps are stored with millisecond precision
const CREATE_COMPANIES_TABLE: &str = r#"
CREATE TABLE companies (
    company_id INTEGER PRIMARY KEY AUTOINCREMENT,
    company_name TEXT NOT NULL UNIQUE CHECK (length(trim(company_name)) > 0),
    country TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'ACTIVE',
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
);
CREATE TRIGGER companies_updated_at AFTER UPDATE ON companies
FOR EACH ROW WHEN NEW.updated_at = OLD.updated_at
BEGIN
    UPDATE companies SET updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
    WHERE company_id = NEW.company_id;
END;
"#;

const CREATE_EQUITIES_TABLE: &str = r#"
CREATE TABLE equities (
    equity_id INTEGER PRIMARY KEY AUTOINCREMENT,
    company_id INTEGER NOT NULL REFERENCES companies(company_id),
    ticker TEXT NOT NULL UNIQUE,
    isin TEXT NOT NULL UNIQUE,
    listing_date TEXT,
    trading_status TEXT NOT NULL DEFAULT 'ACTIVE',
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
);
CREATE INDEX IF NOT EXISTS idx_equities_company ON equities(company_id);
CREATE TRIGGER equities_updated_at AFTER UPDATE ON equities
FOR EACH ROW WHEN NEW.updated_at = OLD.updated_at
BEGIN
    UPDATE equities SET updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
    WHERE equity_id = NEW.equity_id;
END;
"#;

const CREATE_TRADING_DAYS_TABLE: &str = r#"
CREATE TABLE trading_days (
    trading_id INTEGER PRIMARY KEY AUTOINCREMENT,
    trading_date TEXT NOT NULL UNIQUE,
    is_open INTEGER NOT NULL DEFAULT 1,
    note TEXT,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
);
CREATE TRIGGER trading_days_updated_at AFTER UPDATE ON trading_days
FOR EACH ROW WHEN NEW.updated_at = OLD.updated_at
BEGIN
    UPDATE trading_days SET updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
    WHERE trading_id = NEW.trading_id;
END;
"#;

const CREATE_EQUITY_EOD_PRICES_TABLE: &str = r#"
CREATE TABLE equity_eod_prices (
    eod_price_id INTEGER PRIMARY KEY AUTOINCREMENT,
    equity_id INTEGER NOT NULL REFERENCES equities(equity_id),
    trading_date TEXT NOT NULL REFERENCES trading_days(trading_date),
    open_price REAL,
    high_price REAL,
    low_price REAL,
    close_price REAL NOT NULL,
    volume INTEGER,
    traded_value REAL,
    full_data_flag INTEGER NOT NULL DEFAULT 0,
    data_source TEXT,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
    UNIQUE(equity_id, trading_date)
);
CREATE INDEX IF NOT EXISTS idx_eod_prices_trading_date ON equity_eod_prices(trading_date);
CREATE TRIGGER equity_eod_prices_updated_at AFTER UPDATE ON equity_eod_prices
FOR EACH ROW WHEN NEW.updated_at = OLD.updated_at
BEGIN
    UPDATE equity_eod_prices SET updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
    WHERE eod_price_id = NEW.eod_price_id;
END;
"#;
