//! SQLite database module

pub mod models;
mod company;
mod connection;
mod constraints;
mod eod_price;
mod equity;
mod migrations;
mod trading_day;

use crate::config::StoreLocation;
use crate::error::Result;
use chrono::NaiveDate;
use models::*;
use parking_lot::Mutex;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::time::Duration;

/// SQLite database wrapper
pub struct SqliteDb {
    conn: Mutex<Connection>,
}

impl SqliteDb {
    /// Open the store at `location` and bring its schema up to date
    pub fn open(location: &StoreLocation, busy_timeout: Duration) -> Result<Self> {
        let conn = connection::create_connection(location, busy_timeout)?;

        let db = Self {
            conn: Mutex::new(conn),
        };

        // Run migrations
        db.run_migrations()?;

        Ok(db)
    }

    /// Ephemeral store, mostly for tests
    pub fn open_in_memory() -> Result<Self> {
        Self::open(&StoreLocation::Memory, Duration::ZERO)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock();
        migrations::run_migrations(&conn)
    }

    /// Run `op` inside a single transaction
    ///
    /// Commits when `op` succeeds, rolls back otherwise. The transaction takes
    /// the store's write lock up front, so lookups made by `op` stay valid
    /// until its insert. Waiting for another writer is bounded by the busy
    /// timeout.
    fn in_transaction<T>(&self, op: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| {
                if constraints::is_busy(&e) {
                    tracing::warn!("Store busy, transaction not started: {}", e);
                    constraints::contended("transaction", "begin")
                } else {
                    e.into()
                }
            })?;

        match op(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback() {
                    tracing::error!("Rollback failed after '{}': {}", e, rollback_err);
                }
                Err(e)
            }
        }
    }

    // ========== Company Registry ==========

    /// Create a new company
    pub fn create_company(&self, fields: NewCompany) -> Result<Company> {
        self.in_transaction(|tx| company::create_company(tx, fields))
    }

    /// Get company by ID
    pub fn get_company(&self, company_id: i64) -> Result<Option<Company>> {
        let conn = self.conn.lock();
        company::get_company(&conn, company_id)
    }

    /// Find company by name
    pub fn find_company_by_name(&self, name: &str) -> Result<Option<Company>> {
        let conn = self.conn.lock();
        company::find_company_by_name(&conn, name)
    }

    /// Get all companies
    pub fn list_companies(&self) -> Result<Vec<Company>> {
        let conn = self.conn.lock();
        company::list_companies(&conn)
    }

    /// Get company count
    pub fn count_companies(&self) -> Result<i64> {
        let conn = self.conn.lock();
        company::count_companies(&conn)
    }

    // ========== Equity Registry ==========

    /// Create a new equity
    pub fn create_equity(&self, fields: NewEquity) -> Result<Equity> {
        self.in_transaction(|tx| equity::create_equity(tx, fields))
    }

    /// Get equity by ID
    pub fn get_equity(&self, equity_id: i64) -> Result<Option<Equity>> {
        let conn = self.conn.lock();
        equity::get_equity(&conn, equity_id)
    }

    /// Find equity by ticker
    pub fn find_equity_by_ticker(&self, ticker: &str) -> Result<Option<Equity>> {
        let conn = self.conn.lock();
        equity::find_equity_by_ticker(&conn, ticker)
    }

    /// Find equity by ISIN
    pub fn find_equity_by_isin(&self, isin: &str) -> Result<Option<Equity>> {
        let conn = self.conn.lock();
        equity::find_equity_by_isin(&conn, isin)
    }

    /// Get all equities of a company
    pub fn list_equities_for_company(&self, company_id: i64) -> Result<Vec<Equity>> {
        let conn = self.conn.lock();
        equity::list_equities_for_company(&conn, company_id)
    }

    /// Get equity count
    pub fn count_equities(&self) -> Result<i64> {
        let conn = self.conn.lock();
        equity::count_equities(&conn)
    }

    // ========== Trading Calendar ==========

    /// Get or create the trading day for a date
    pub fn get_or_create_trading_day(&self, fields: NewTradingDay) -> Result<TradingDay> {
        self.in_transaction(|tx| trading_day::get_or_create_trading_day(tx, fields))
    }

    /// Get trading day by date
    pub fn get_trading_day(&self, date: NaiveDate) -> Result<Option<TradingDay>> {
        let conn = self.conn.lock();
        trading_day::get_trading_day(&conn, date)
    }

    /// Get trading days in an inclusive date range
    pub fn list_trading_days(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<TradingDay>> {
        let conn = self.conn.lock();
        trading_day::list_trading_days(&conn, from, to)
    }

    /// Get trading day count
    pub fn count_trading_days(&self) -> Result<i64> {
        let conn = self.conn.lock();
        trading_day::count_trading_days(&conn)
    }

    // ========== EOD Price Ledger ==========

    /// Create a new EOD price record
    pub fn create_eod_price(&self, fields: NewEodPrice) -> Result<EquityEodPrice> {
        self.in_transaction(|tx| eod_price::create_eod_price(tx, fields))
    }

    /// Get the EOD price for an equity on a date
    pub fn get_eod_price(
        &self,
        equity_id: i64,
        trading_date: NaiveDate,
    ) -> Result<Option<EquityEodPrice>> {
        let conn = self.conn.lock();
        eod_price::get_eod_price(&conn, equity_id, trading_date)
    }

    /// Get price history for an equity
    pub fn list_eod_prices_for_equity(&self, equity_id: i64) -> Result<Vec<EquityEodPrice>> {
        let conn = self.conn.lock();
        eod_price::list_eod_prices_for_equity(&conn, equity_id)
    }

    /// Get all prices recorded on a trading day
    pub fn list_eod_prices_for_date(&self, trading_date: NaiveDate) -> Result<Vec<EquityEodPrice>> {
        let conn = self.conn.lock();
        eod_price::list_eod_prices_for_date(&conn, trading_date)
    }

    /// Get EOD price count
    pub fn count_eod_prices(&self) -> Result<i64> {
        let conn = self.conn.lock();
        eod_price::count_eod_prices(&conn)
    }
}
