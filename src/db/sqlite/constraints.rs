//! Translation of SQLite write failures into domain errors
//!
//! Creates hold the write lock from their pre-checks through the insert, but
//! the store enforces its own constraints as well, so every insert path
//! funnels its error through [`translate_write_error`].

use crate::error::AppError;
use rusqlite::ffi;
use rusqlite::ErrorCode;

/// Map a failed write on `entity` to a domain error
///
/// `key` describes the row being written and is echoed in the error.
pub fn translate_write_error(err: rusqlite::Error, entity: &str, key: &str) -> AppError {
    if is_busy(&err) {
        tracing::warn!("Store busy, {} write ({}) abandoned: {}", entity, key, err);
        return contended(entity, key);
    }

    let (extended_code, message) = match &err {
        rusqlite::Error::SqliteFailure(e, msg) if e.code == ErrorCode::ConstraintViolation => {
            (e.extended_code, msg.clone().unwrap_or_default())
        }
        _ => return AppError::Database(err),
    };

    tracing::warn!("Constraint rejected {} write ({}): {}", entity, key, message);

    match extended_code {
        ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
            let fields = conflicting_columns(&message);
            AppError::DuplicateEntity {
                entity: entity.to_string(),
                fields,
                value: key.to_string(),
            }
        }
        ffi::SQLITE_CONSTRAINT_FOREIGNKEY => AppError::reference_not_found(entity, key),
        _ => AppError::ConstraintViolation(format!("{} ({}): {}", entity, key, message)),
    }
}

/// Whether another writer holds the store's write lock
pub fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::DatabaseBusy || e.code == ErrorCode::DatabaseLocked
    )
}

/// Domain error for a write that lost to a concurrent writer
pub fn contended(entity: &str, key: &str) -> AppError {
    AppError::ConstraintViolation(format!(
        "{} ({}): store locked by a concurrent writer",
        entity, key
    ))
}

/// Column names from "UNIQUE constraint failed: table.col_a, table.col_b"
fn conflicting_columns(message: &str) -> Vec<String> {
    message
        .split_once("failed:")
        .map(|(_, cols)| {
            cols.split(',')
                .map(|c| c.trim())
                .map(|c| c.rsplit('.').next().unwrap_or(c).to_string())
                .filter(|c| !c.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             CREATE TABLE parent (id INTEGER PRIMARY KEY);
             CREATE TABLE child (
                 id INTEGER PRIMARY KEY,
                 parent_id INTEGER REFERENCES parent(id),
                 a TEXT NOT NULL,
                 b TEXT,
                 UNIQUE(a, b)
             );",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_conflicting_columns() {
        assert_eq!(
            conflicting_columns("UNIQUE constraint failed: equities.ticker"),
            vec!["ticker"]
        );
        assert_eq!(
            conflicting_columns(
                "UNIQUE constraint failed: equity_eod_prices.equity_id, equity_eod_prices.trading_date"
            ),
            vec!["equity_id", "trading_date"]
        );
        assert!(conflicting_columns("something else").is_empty());
    }

    #[test]
    fn test_unique_maps_to_duplicate() {
        let conn = test_conn();
        conn.execute("INSERT INTO child (a, b) VALUES ('x', 'y')", []).unwrap();
        let err = conn
            .execute("INSERT INTO child (a, b) VALUES ('x', 'y')", [])
            .unwrap_err();

        match translate_write_error(err, "child", "x/y") {
            AppError::DuplicateEntity { fields, .. } => assert_eq!(fields, vec!["a", "b"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_foreign_key_maps_to_reference_not_found() {
        let conn = test_conn();
        let err = conn
            .execute("INSERT INTO child (parent_id, a) VALUES (99, 'x')", [])
            .unwrap_err();

        assert!(matches!(
            translate_write_error(err, "child", "99"),
            AppError::ReferenceNotFound { .. }
        ));
    }

    #[test]
    fn test_other_constraint_maps_to_violation() {
        let conn = test_conn();
        let err = conn
            .execute("INSERT INTO child (a) VALUES (NULL)", [])
            .unwrap_err();

        assert!(matches!(
            translate_write_error(err, "child", "null"),
            AppError::ConstraintViolation(_)
        ));
    }

    #[test]
    fn test_busy_maps_to_violation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("busy.db");
        let mut holder = Connection::open(&path).unwrap();
        holder.execute_batch("CREATE TABLE t (a TEXT UNIQUE);").unwrap();
        let tx = holder
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)
            .unwrap();

        let other = Connection::open(&path).unwrap();
        let err = other.execute("INSERT INTO t (a) VALUES ('x')", []).unwrap_err();
        assert!(is_busy(&err));
        assert!(matches!(
            translate_write_error(err, "t", "x"),
            AppError::ConstraintViolation(_)
        ));

        drop(tx);
    }

    #[test]
    fn test_non_constraint_error_passes_through() {
        let conn = test_conn();
        let err = conn.execute("INSERT INTO missing_table VALUES (1)", []).unwrap_err();
        assert!(matches!(
            translate_write_error(err, "child", "1"),
            AppError::Database(_)
        ));
    }
}
