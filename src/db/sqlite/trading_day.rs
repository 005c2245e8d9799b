//! Trading calendar
//!
//! Trading days are keyed by date. Creation is get-or-create: a request for
//! a date already in the calendar returns the stored row untouched.

use super::constraints::translate_write_error;
use super::models::{NewTradingDay, TradingDay, TradingDayDraft};
use crate::error::{AppError, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

const TRADING_DAY_COLUMNS: &str =
    "trading_id, trading_date, is_open, note, created_at, updated_at";

fn map_trading_day(row: &Row<'_>) -> rusqlite::Result<TradingDay> {
    Ok(TradingDay {
        trading_id: row.get(0)?,
        trading_date: row.get(1)?,
        is_open: row.get::<_, i32>(2)? == 1,
        note: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Get the trading day for a date, creating it if absent
pub fn get_or_create_trading_day(conn: &Connection, fields: NewTradingDay) -> Result<TradingDay> {
    let draft = fields.into_draft()?;

    if let Some(existing) = get_trading_day(conn, draft.trading_date)? {
        tracing::debug!("Trading day {} already exists", draft.trading_date);
        return Ok(existing);
    }

    insert_trading_day(conn, &draft)
}

/// Insert a trading day, returning the stored row if the date is taken
fn insert_trading_day(conn: &Connection, draft: &TradingDayDraft) -> Result<TradingDay> {
    let inserted = conn.execute(
        "INSERT INTO trading_days (trading_date, is_open, note) VALUES (?1, ?2, ?3)",
        params![draft.trading_date, draft.is_open as i32, draft.note],
    );

    if let Err(e) = inserted {
        let key = draft.trading_date.to_string();
        return match translate_write_error(e, "trading_day", &key) {
            // The date was stored after the lookup
            AppError::DuplicateEntity { .. } => match get_trading_day(conn, draft.trading_date)? {
                Some(existing) => Ok(existing),
                None => Err(AppError::duplicate("trading_day", &["trading_date"], key)),
            },
            other => Err(other),
        };
    }

    let id = conn.last_insert_rowid();
    tracing::info!("Created trading day: {} ({})", draft.trading_date, id);

    get_trading_day_by_id(conn, id)
}

/// Reload a trading day by ID (used after insert)
fn get_trading_day_by_id(conn: &Connection, id: i64) -> Result<TradingDay> {
    let sql = format!(
        "SELECT {} FROM trading_days WHERE trading_id = ?1",
        TRADING_DAY_COLUMNS
    );
    Ok(conn.query_row(&sql, params![id], map_trading_day)?)
}

/// Get trading day by date
pub fn get_trading_day(conn: &Connection, date: NaiveDate) -> Result<Option<TradingDay>> {
    let sql = format!(
        "SELECT {} FROM trading_days WHERE trading_date = ?1",
        TRADING_DAY_COLUMNS
    );
    Ok(conn.query_row(&sql, params![date], map_trading_day).optional()?)
}

/// Get trading days between two dates (inclusive)
pub fn list_trading_days(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<TradingDay>> {
    let sql = format!(
        "SELECT {} FROM trading_days
         WHERE trading_date >= ?1 AND trading_date <= ?2
         ORDER BY trading_date",
        TRADING_DAY_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;

    let days = stmt
        .query_map(params![from, to], map_trading_day)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(days)
}

/// Get trading day count
pub fn count_trading_days(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM trading_days", [], |row| row.get(0))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::migrations::run_migrations;

    fn create_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_create_trading_day_defaults() {
        let conn = create_test_db();

        let day = get_or_create_trading_day(&conn, NewTradingDay::new(date(2024, 1, 15))).unwrap();

        assert!(day.trading_id > 0);
        assert_eq!(day.trading_date, date(2024, 1, 15));
        assert!(day.is_open);
        assert!(day.note.is_none());
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let conn = create_test_db();

        let first = get_or_create_trading_day(&conn, NewTradingDay::new(date(2024, 1, 15))).unwrap();
        let second = get_or_create_trading_day(
            &conn,
            NewTradingDay::new(date(2024, 1, 15))
                .closed()
                .with_note("Public holiday"),
        )
        .unwrap();

        assert_eq!(first.trading_id, second.trading_id);
        assert!(second.is_open);
        assert!(second.note.is_none());
        assert_eq!(count_trading_days(&conn).unwrap(), 1);
    }

    #[test]
    fn test_closed_day_with_note() {
        let conn = create_test_db();

        let day = get_or_create_trading_day(
            &conn,
            NewTradingDay::new(date(2024, 4, 1)).closed().with_note("Easter Monday"),
        )
        .unwrap();

        assert!(!day.is_open);
        assert_eq!(day.note.as_deref(), Some("Easter Monday"));
    }

    #[test]
    fn test_missing_date_rejected() {
        let conn = create_test_db();

        let err = get_or_create_trading_day(&conn, NewTradingDay::default()).unwrap_err();
        match err {
            AppError::MissingField(fields) => assert_eq!(fields, vec!["trading_date"]),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(count_trading_days(&conn).unwrap(), 0);
    }

    #[test]
    fn test_list_trading_days_range() {
        let conn = create_test_db();
        for d in [17, 15, 16, 19] {
            get_or_create_trading_day(&conn, NewTradingDay::new(date(2024, 1, d))).unwrap();
        }

        let days = list_trading_days(&conn, date(2024, 1, 15), date(2024, 1, 17)).unwrap();
        let dates: Vec<_> = days.iter().map(|d| d.trading_date).collect();
        assert_eq!(dates, vec![date(2024, 1, 15), date(2024, 1, 16), date(2024, 1, 17)]);
    }

    #[test]
    fn test_insert_on_taken_date_returns_stored_row() {
        let conn = create_test_db();
        let stored = get_or_create_trading_day(&conn, NewTradingDay::new(date(2024, 1, 15))).unwrap();

        let draft = NewTradingDay::new(date(2024, 1, 15))
            .closed()
            .with_note("Public holiday")
            .into_draft()
            .unwrap();
        let day = insert_trading_day(&conn, &draft).unwrap();

        assert_eq!(day, stored);
        assert!(day.is_open);
        assert_eq!(count_trading_days(&conn).unwrap(), 1);
    }
}
