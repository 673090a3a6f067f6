//! SQLite handle and schema
//!
//! Creates the card catalog, the per-(user, card) schedule table and the
//! append-only review event log. The handle is passed explicitly to the
//! schedule store and the catalog instead of living in a global.

use crate::error::{Result, StoreError};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared connection. Cloning hands out another reference to the same database.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        tracing::debug!(path = %path.as_ref().display(), "Opened database");
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

/// Creates tables and indexes if they don't exist yet.
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS cards (
            id TEXT PRIMARY KEY,
            word TEXT NOT NULL,
            definition TEXT NOT NULL,
            part_of_speech TEXT NOT NULL DEFAULT '',
            difficulty_level INTEGER NOT NULL DEFAULT 0,
            topic_tags TEXT NOT NULL DEFAULT '[]',
            example_sentence TEXT,
            pronunciation TEXT
        )",
        (),
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_cards_difficulty ON cards(difficulty_level, id)",
        (),
    )?;

    // One row per (user, card); next_review_at is unix milliseconds.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schedule_records (
            user_id TEXT NOT NULL,
            card_id TEXT NOT NULL,
            interval_days INTEGER NOT NULL DEFAULT 0,
            ease_factor REAL NOT NULL DEFAULT 2.5,
            next_review_at INTEGER NOT NULL,
            review_count INTEGER NOT NULL DEFAULT 0,
            accuracy REAL NOT NULL DEFAULT 0,
            depth_level INTEGER NOT NULL DEFAULT 1,
            PRIMARY KEY (user_id, card_id)
        )",
        (),
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_schedule_due ON schedule_records(user_id, next_review_at)",
        (),
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS review_events (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            card_id TEXT NOT NULL,
            event_type TEXT NOT NULL,
            payload TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )",
        (),
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_card ON review_events(user_id, card_id, created_at)",
        (),
    )?;

    Ok(())
}

pub(crate) fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

/// Reads a millisecond timestamp column inside a row mapper.
pub(crate) fn millis_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let ms: i64 = row.get(idx)?;
    DateTime::from_timestamp_millis(ms).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, ms))
}

/// Drops sub-millisecond precision so values survive a round trip through SQLite.
pub(crate) fn truncate_to_millis(ts: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let ms = to_millis(ts);
    DateTime::from_timestamp_millis(ms).ok_or(StoreError::InvalidTimestamp(ms))
}
