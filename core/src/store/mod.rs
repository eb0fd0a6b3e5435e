//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The refresh reads records through RecordSource; it never executes SQL.

mod records;
mod snapshot;

use crate::error::AnalyticsResult;
use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard};

pub struct RecordStore {
    conn: Mutex<Connection>,
}

impl RecordStore {
    pub fn open(path: &str) -> AnalyticsResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> AnalyticsResult<Self> {
        let conn = Connection::open(":memory:")?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> AnalyticsResult<()> {
        self.conn()
            .execute_batch(include_str!("../../../migrations/001_records.sql"))?;
        Ok(())
    }

    /// The connection guard. A poisoned lock still holds a usable connection.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}
