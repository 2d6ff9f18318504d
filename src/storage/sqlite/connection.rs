//! Connection handling for the `SQLite` quad store.
//!
//! Mutex acquisition with poison recovery, pragma configuration, and
//! classification of constraint errors.

use crate::{Error, Result};
use rusqlite::{Connection, ErrorCode, ffi};
use std::sync::{Mutex, MutexGuard};

/// Default `busy_timeout` in milliseconds.
pub const DEFAULT_BUSY_TIMEOUT_MS: u32 = 5000;

/// Helper to acquire mutex lock with poison recovery.
///
/// If the mutex is poisoned (due to a panic in a previous critical section),
/// we recover the inner value and log a warning. A statement that panicked
/// mid-way has already been rolled back by `SQLite`.
pub fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("SQLite quad store mutex was poisoned, recovering");
            metrics::counter!("sqlquad_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}

/// Configures a `SQLite` connection for concurrent writers.
///
/// # Configuration Applied
///
/// - **WAL mode**: concurrent readers with a single writer
/// - **NORMAL synchronous**: balances durability with performance
/// - **`busy_timeout`**: writers on other connections wait instead of failing
/// - **`foreign_keys`**: edges may only reference existing vertexes
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if foreign keys cannot be enabled.
pub fn configure_connection(conn: &Connection, busy_timeout_ms: u32) -> Result<()> {
    // journal_mode returns a row ("wal" or "memory"), so the result is ignored.
    let _ = conn.pragma_update(None, "journal_mode", "WAL");
    let _ = conn.pragma_update(None, "synchronous", "NORMAL");
    let _ = conn.pragma_update(None, "busy_timeout", busy_timeout_ms);
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(|e| storage_error("configure_connection", &e))?;

    Ok(())
}

/// Whether `err` is a uniqueness violation (unique index or primary key).
///
/// These are the only errors the import pipeline recovers from.
#[must_use]
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => {
            failure.code == ErrorCode::ConstraintViolation
                && matches!(
                    failure.extended_code,
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                )
        },
        _ => false,
    }
}

/// Maps a storage failure to [`Error::OperationFailed`].
pub fn storage_error(operation: &str, err: &rusqlite::Error) -> Error {
    Error::OperationFailed {
        operation: operation.to_string(),
        cause: err.to_string(),
    }
}
