//! SQLite connection utilities

use crate::config::StoreLocation;
use crate::error::Result;
use rusqlite::Connection;
use std::time::Duration;

/// Create a new SQLite connection for `location`
///
/// Foreign keys are always enforced. File stores also get WAL journaling
/// and a busy timeout so that concurrent writers wait instead of failing.
pub fn create_connection(location: &StoreLocation, busy_timeout: Duration) -> Result<Connection> {
    let conn = match location {
        StoreLocation::Memory => Connection::open_in_memory()?,
        StoreLocation::File(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }

            let conn = Connection::open(path)?;
            conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
            conn.busy_timeout(busy_timeout)?;
            tracing::info!("Opened SQLite store at {:?}", path);
            conn
        }
    };

    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    Ok(conn)
}
