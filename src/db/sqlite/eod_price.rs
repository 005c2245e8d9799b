//! End-of-day price ledger
//!
//! One record per equity per trading day. The equity and the trading day are
//! expected to have been resolved through their registries first; the store's
//! foreign keys reject anything that slips through.

use super::constraints::translate_write_error;
use super::models::{EodPriceDraft, EquityEodPrice, NewEodPrice};
use crate::error::{AppError, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

const EOD_PRICE_COLUMNS: &str = "eod_price_id, equity_id, trading_date, open_price, high_price, \
     low_price, close_price, volume, traded_value, full_data_flag, data_source, created_at, updated_at";

fn map_eod_price(row: &Row<'_>) -> rusqlite::Result<EquityEodPrice> {
    Ok(EquityEodPrice {
        eod_price_id: row.get(0)?,
        equity_id: row.get(1)?,
        trading_date: row.get(2)?,
        open_price: row.get(3)?,
        high_price: row.get(4)?,
        low_price: row.get(5)?,
        close_price: row.get(6)?,
        volume: row.get(7)?,
        traded_value: row.get(8)?,
        full_data_flag: row.get::<_, i32>(9)? == 1,
        data_source: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

/// Create a new EOD price record
pub fn create_eod_price(conn: &Connection, fields: NewEodPrice) -> Result<EquityEodPrice> {
    let draft = fields.into_draft()?;
    let key = format!("{}/{}", draft.equity_id, draft.trading_date);

    if get_eod_price(conn, draft.equity_id, draft.trading_date)?.is_some() {
        tracing::warn!("Rejected EOD price: {} already recorded", key);
        return Err(AppError::duplicate(
            "equity_eod_price",
            &["equity_id", "trading_date"],
            key,
        ));
    }

    insert_eod_price(conn, &draft)
}

/// Insert a validated price record, relying on the schema for the pair key
fn insert_eod_price(conn: &Connection, draft: &EodPriceDraft) -> Result<EquityEodPrice> {
    let key = format!("{}/{}", draft.equity_id, draft.trading_date);

    conn.execute(
        "INSERT INTO equity_eod_prices (
            equity_id, trading_date, open_price, high_price, low_price, close_price,
            volume, traded_value, full_data_flag, data_source
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            draft.equity_id,
            draft.trading_date,
            draft.open_price,
            draft.high_price,
            draft.low_price,
            draft.close_price,
            draft.volume,
            draft.traded_value,
            draft.full_data_flag as i32,
            draft.data_source,
        ],
    )
    .map_err(|e| translate_write_error(e, "equity_eod_price", &key))?;

    let id = conn.last_insert_rowid();
    tracing::info!("Created EOD price: {} ({})", key, id);

    get_eod_price_by_id(conn, id)
}

/// Reload an EOD price by ID (used after insert)
fn get_eod_price_by_id(conn: &Connection, id: i64) -> Result<EquityEodPrice> {
    let sql = format!(
        "SELECT {} FROM equity_eod_prices WHERE eod_price_id = ?1",
        EOD_PRICE_COLUMNS
    );
    Ok(conn.query_row(&sql, params![id], map_eod_price)?)
}

/// Get the EOD price for an equity on a date
pub fn get_eod_price(
    conn: &Connection,
    equity_id: i64,
    trading_date: NaiveDate,
) -> Result<Option<EquityEodPrice>> {
    let sql = format!(
        "SELECT {} FROM equity_eod_prices WHERE equity_id = ?1 AND trading_date = ?2",
        EOD_PRICE_COLUMNS
    );
    Ok(conn
        .query_row(&sql, params![equity_id, trading_date], map_eod_price)
        .optional()?)
}

/// Get all EOD prices for an equity, oldest first
pub fn list_eod_prices_for_equity(conn: &Connection, equity_id: i64) -> Result<Vec<EquityEodPrice>> {
    let sql = format!(
        "SELECT {} FROM equity_eod_prices WHERE equity_id = ?1 ORDER BY trading_date",
        EOD_PRICE_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;

    let prices = stmt
        .query_map(params![equity_id], map_eod_price)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(prices)
}

/// Get all EOD prices recorded for a trading day
pub fn list_eod_prices_for_date(
    conn: &Connection,
    trading_date: NaiveDate,
) -> Result<Vec<EquityEodPrice>> {
    let sql = format!(
        "SELECT {} FROM equity_eod_prices WHERE trading_date = ?1 ORDER BY equity_id",
        EOD_PRICE_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;

    let prices = stmt
        .query_map(params![trading_date], map_eod_price)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(prices)
}

/// Get EOD price count
pub fn count_eod_prices(conn: &Connection) -> Result<i64> {
    let count: i64 =
        conn.query_row("SELECT COUNT(*) FROM equity_eod_prices", [], |row| row.get(0))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::company::create_company;
    use crate::db::sqlite::equity::create_equity;
    use crate::db::sqlite::migrations::run_migrations;
    use crate::db::sqlite::models::{Country, NewCompany, NewEquity, NewTradingDay};
    use crate::db::sqlite::trading_day::get_or_create_trading_day;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// In-memory store with one equity and trading days 2024-01-15..=17
    fn create_test_db() -> (Connection, i64) {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();

        let company = create_company(&conn, NewCompany::new("BRVM", Country::CoteDIvoire)).unwrap();
        let equity =
            create_equity(&conn, NewEquity::new(company.company_id, "SGBI", "CI0000000600"))
                .unwrap();
        for d in 15..=17 {
            get_or_create_trading_day(&conn, NewTradingDay::new(date(2024, 1, d))).unwrap();
        }

        (conn, equity.equity_id)
    }

    #[test]
    fn test_create_eod_price_defaults() {
        let (conn, equity_id) = create_test_db();

        let price =
            create_eod_price(&conn, NewEodPrice::new(equity_id, date(2024, 1, 15), 1200.0)).unwrap();

        assert!(price.eod_price_id > 0);
        assert_eq!(price.close_price, 1200.0);
        assert!(price.open_price.is_none());
        assert!(price.high_price.is_none());
        assert!(price.low_price.is_none());
        assert!(price.volume.is_none());
        assert!(!price.full_data_flag);
        assert!(price.data_source.is_none());
    }

    #[test]
    fn test_create_eod_price_full_record() {
        let (conn, equity_id) = create_test_db();

        let price = create_eod_price(
            &conn,
            NewEodPrice {
                open_price: Some(1190.0),
                high_price: Some(1210.0),
                low_price: Some(1185.0),
                volume: Some(4_520),
                traded_value: Some(5_424_000.0),
                full_data_flag: Some(true),
                data_source: Some("brvm.org".to_string()),
                ..NewEodPrice::new(equity_id, date(2024, 1, 16), 1200.0)
            },
        )
        .unwrap();

        assert_eq!(price.open_price, Some(1190.0));
        assert_eq!(price.high_price, Some(1210.0));
        assert_eq!(price.low_price, Some(1185.0));
        assert_eq!(price.volume, Some(4_520));
        assert!(price.full_data_flag);
        assert_eq!(price.data_source.as_deref(), Some("brvm.org"));
    }

    #[test]
    fn test_duplicate_pair_rejected() {
        let (conn, equity_id) = create_test_db();
        create_eod_price(&conn, NewEodPrice::new(equity_id, date(2024, 1, 15), 1200.0)).unwrap();

        let err = create_eod_price(&conn, NewEodPrice::new(equity_id, date(2024, 1, 15), 1250.0))
            .unwrap_err();

        match err {
            AppError::DuplicateEntity { fields, .. } => {
                assert_eq!(fields, vec!["equity_id", "trading_date"])
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let stored = get_eod_price(&conn, equity_id, date(2024, 1, 15)).unwrap().unwrap();
        assert_eq!(stored.close_price, 1200.0);
        assert_eq!(count_eod_prices(&conn).unwrap(), 1);
    }

    #[test]
    fn test_missing_keys_rejected() {
        let (conn, equity_id) = create_test_db();

        let err = create_eod_price(
            &conn,
            NewEodPrice {
                equity_id: Some(equity_id),
                close_price: Some(1200.0),
                ..Default::default()
            },
        )
        .unwrap_err();

        match err {
            AppError::MissingField(fields) => assert_eq!(fields, vec!["trading_date"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_close_rejected() {
        let (conn, equity_id) = create_test_db();

        let err = create_eod_price(
            &conn,
            NewEodPrice {
                equity_id: Some(equity_id),
                trading_date: Some(date(2024, 1, 15)),
                open_price: Some(1190.0),
                ..Default::default()
            },
        )
        .unwrap_err();

        assert!(matches!(err, AppError::MissingField(_)));
        assert_eq!(count_eod_prices(&conn).unwrap(), 0);
    }

    #[test]
    fn test_unknown_equity_rejected_by_store() {
        let (conn, equity_id) = create_test_db();

        let err = create_eod_price(&conn, NewEodPrice::new(equity_id + 1, date(2024, 1, 15), 10.0))
            .unwrap_err();
        assert!(matches!(err, AppError::ReferenceNotFound { .. }));

        let err = create_eod_price(&conn, NewEodPrice::new(equity_id, date(2024, 2, 1), 10.0))
            .unwrap_err();
        assert!(matches!(err, AppError::ReferenceNotFound { .. }));

        assert_eq!(count_eod_prices(&conn).unwrap(), 0);
    }

    #[test]
    fn test_list_prices() {
        let (conn, equity_id) = create_test_db();
        for (d, close) in [(17, 1230.0), (15, 1200.0), (16, 1215.0)] {
            create_eod_price(&conn, NewEodPrice::new(equity_id, date(2024, 1, d), close)).unwrap();
        }

        let closes: Vec<_> = list_eod_prices_for_equity(&conn, equity_id)
            .unwrap()
            .iter()
            .map(|p| p.close_price)
            .collect();
        assert_eq!(closes, vec![1200.0, 1215.0, 1230.0]);

        let on_day = list_eod_prices_for_date(&conn, date(2024, 1, 16)).unwrap();
        assert_eq!(on_day.len(), 1);
        assert_eq!(on_day[0].close_price, 1215.0);
    }

    #[test]
    fn test_store_rejects_duplicate_pair() {
        let (conn, equity_id) = create_test_db();
        create_eod_price(&conn, NewEodPrice::new(equity_id, date(2024, 1, 15), 1200.0)).unwrap();

        let draft = NewEodPrice::new(equity_id, date(2024, 1, 15), 1250.0)
            .into_draft()
            .unwrap();
        match insert_eod_price(&conn, &draft).unwrap_err() {
            AppError::DuplicateEntity { fields, .. } => {
                assert_eq!(fields, vec!["equity_id", "trading_date"])
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(count_eod_prices(&conn).unwrap(), 1);
    }
}
