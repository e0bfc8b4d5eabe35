//! Record store with connection pooling and migrations
//!
//! This module is organized by record kind:
//! - `trips` - Trip CRUD and the id → name lookup
//! - `expenses` - Expense insertion and filtered listing
//! - `mileage` - Mileage insertion and filtered listing
//! - `store` - The async [`RecordStore`](crate::report::RecordStore) implementation

use chrono::{DateTime, NaiveDate, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Value;
use tracing::info;

use crate::error::Result;
use crate::models::RecordFilter;

mod expenses;
mod mileage;
mod store;
mod trips;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

pub(crate) fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_default()
}

/// WHERE clause and bound values for a record filter
///
/// Dates are stored as ISO strings, so a lexical BETWEEN is an inclusive
/// date range.
pub(crate) fn filter_clause(filter: &RecordFilter) -> (&'static str, Vec<Value>) {
    match filter {
        RecordFilter::Trip(id) => ("WHERE trip_id = ?", vec![Value::Integer(*id)]),
        RecordFilter::DateRange { start, end } => (
            "WHERE date BETWEEN ? AND ?",
            vec![Value::Text(start.to_string()), Value::Text(end.to_string())],
        ),
        RecordFilter::All => ("", Vec::new()),
    }
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Open (or create) a database file and run migrations
    pub fn new(path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        info!(path = %path, "Opened record store");
        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Uses a temporary file rather than `:memory:` so every pooled
    /// connection sees the same data.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "tripledger_test_{}_{}.db",
            std::process::id(),
            id
        ));

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::new(&path.to_string_lossy())
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            -- WAL mode: readers don't block writers
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            CREATE TABLE IF NOT EXISTS trips (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                start_date TEXT,
                end_date TEXT,
                location TEXT,
                purpose TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS expenses (
                id INTEGER PRIMARY KEY,
                trip_id INTEGER REFERENCES trips(id) ON DELETE SET NULL,
                date TEXT NOT NULL,
                expense_type TEXT NOT NULL DEFAULT 'other',
                vendor TEXT NOT NULL,
                description TEXT,
                amount REAL NOT NULL,
                currency TEXT NOT NULL DEFAULT 'USD',
                location TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_expenses_trip ON expenses(trip_id);
            CREATE INDEX IF NOT EXISTS idx_expenses_date ON expenses(date);

            CREATE TABLE IF NOT EXISTS mileage (
                id INTEGER PRIMARY KEY,
                trip_id INTEGER REFERENCES trips(id) ON DELETE SET NULL,
                date TEXT NOT NULL,
                start_location TEXT NOT NULL,
                end_location TEXT NOT NULL,
                distance REAL NOT NULL,
                purpose TEXT,
                rate REAL NOT NULL,
                cost REAL NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_mileage_trip ON mileage(trip_id);
            CREATE INDEX IF NOT EXISTS idx_mileage_date ON mileage(date);
            "#,
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests;
