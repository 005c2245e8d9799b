//! Equity registry
//!
//! Equities belong to a company and are identified by a ticker and an ISIN,
//! both unique across the store. Creation checks run in a fixed order and the
//! first failure wins:
//!
//! 1. required fields present (`company_id`, `ticker`, `isin`)
//! 2. the owning company exists
//! 3. the ticker is free
//! 4. the ISIN is free

use super::company;
use super::constraints::translate_write_error;
use super::models::{Equity, EquityDraft, NewEquity};
use crate::error::{AppError, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

const EQUITY_COLUMNS: &str =
    "equity_id, company_id, ticker, isin, listing_date, trading_status, created_at, updated_at";

fn map_equity(row: &Row<'_>) -> rusqlite::Result<Equity> {
    Ok(Equity {
        equity_id: row.get(0)?,
        company_id: row.get(1)?,
        ticker: row.get(2)?,
        isin: row.get(3)?,
        listing_date: row.get(4)?,
        trading_status: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Create a new equity
pub fn create_equity(conn: &Connection, fields: NewEquity) -> Result<Equity> {
    let draft = fields.into_draft()?;

    if !company::company_exists(conn, draft.company_id)? {
        tracing::warn!(
            "Rejected equity '{}': company {} not found",
            draft.ticker,
            draft.company_id
        );
        return Err(AppError::reference_not_found(
            "company",
            draft.company_id.to_string(),
        ));
    }

    if find_equity_by_ticker(conn, &draft.ticker)?.is_some() {
        tracing::warn!("Rejected equity: ticker '{}' already exists", draft.ticker);
        return Err(AppError::duplicate("equity", &["ticker"], draft.ticker));
    }

    if find_equity_by_isin(conn, &draft.isin)?.is_some() {
        tracing::warn!("Rejected equity: ISIN '{}' already exists", draft.isin);
        return Err(AppError::duplicate("equity", &["isin"], draft.isin));
    }

    insert_equity(conn, &draft)
}

/// Insert a validated equity, relying on the schema for uniqueness
fn insert_equity(conn: &Connection, draft: &EquityDraft) -> Result<Equity> {
    conn.execute(
        "INSERT INTO equities (company_id, ticker, isin, listing_date, trading_status)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            draft.company_id,
            draft.ticker,
            draft.isin,
            draft.listing_date,
            draft.trading_status,
        ],
    )
    .map_err(|e| {
        translate_write_error(e, "equity", &format!("{}/{}", draft.ticker, draft.isin))
    })?;

    let id = conn.last_insert_rowid();
    tracing::info!(
        "Created equity: {} ({}) for company {}",
        draft.ticker,
        id,
        draft.company_id
    );

    get_equity_by_id(conn, id)
}

/// Reload an equity by ID (used after insert)
fn get_equity_by_id(conn: &Connection, id: i64) -> Result<Equity> {
    let sql = format!("SELECT {} FROM equities WHERE equity_id = ?1", EQUITY_COLUMNS);
    Ok(conn.query_row(&sql, params![id], map_equity)?)
}

/// Get equity by ID
pub fn get_equity(conn: &Connection, id: i64) -> Result<Option<Equity>> {
    let sql = format!("SELECT {} FROM equities WHERE equity_id = ?1", EQUITY_COLUMNS);
    Ok(conn.query_row(&sql, params![id], map_equity).optional()?)
}

/// Find equity by ticker
pub fn find_equity_by_ticker(conn: &Connection, ticker: &str) -> Result<Option<Equity>> {
    let sql = format!("SELECT {} FROM equities WHERE ticker = ?1", EQUITY_COLUMNS);
    Ok(conn.query_row(&sql, params![ticker], map_equity).optional()?)
}

/// Find equity by ISIN
pub fn find_equity_by_isin(conn: &Connection, isin: &str) -> Result<Option<Equity>> {
    let sql = format!("SELECT {} FROM equities WHERE isin = ?1", EQUITY_COLUMNS);
    Ok(conn.query_row(&sql, params![isin], map_equity).optional()?)
}

/// Get all equities listed by a company
pub fn list_equities_for_company(conn: &Connection, company_id: i64) -> Result<Vec<Equity>> {
    let sql = format!(
        "SELECT {} FROM equities WHERE company_id = ?1 ORDER BY ticker",
        EQUITY_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;

    let equities = stmt
        .query_map(params![company_id], map_equity)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(equities)
}

/// Get equity count
pub fn count_equities(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM equities", [], |row| row.get(0))?;
    Ok(count)
}
