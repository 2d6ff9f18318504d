//! Orphan vertex collection.
//!
//! Deleting quads never deletes vertexes, so terms that no quad uses any
//! more stay behind. Vacuum scans for vertexes that no edge references in
//! any role and feeds their ids to a [`VertexDeleter`].
//!
//! # Example
//!
//! ```
//! use sqlquad::models::{Quad, QuadPattern, Term};
//! use sqlquad::storage::SqliteQuadStore;
//!
//! let store = SqliteQuadStore::in_memory()?;
//! store.create_tables()?;
//! let quad = Quad::triple(
//!     Term::named_node("http://ex.com/s"),
//!     Term::named_node("http://ex.com/p"),
//!     Term::literal("o"),
//! );
//! store.import([quad.clone()])?;
//! store.remove([quad])?;
//!
//! let result = store.vacuum()?;
//! assert_eq!(result.vertexes_deleted, 4);
//! assert_eq!(store.vertex_count()?, 0);
//! # Ok::<(), sqlquad::Error>(())
//! ```

// Page sizes fit comfortably in i64.
#![allow(clippy::cast_possible_wrap)]

use crate::Result;
use crate::config::MAX_BATCH_SIZE;
use crate::models::VertexId;
use crate::pipeline::VertexDeleter;
use crate::storage::sqlite::{ORPHAN_CONDITION, SqliteQuadStore, storage_error};
use std::time::{Duration, Instant};
use tracing::{info, instrument};

/// Safely converts Duration to milliseconds as u64, capping at `u64::MAX`.
#[inline]
fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Result of a vacuum run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VacuumResult {
    /// Orphan vertexes found by the scan.
    pub vertexes_scanned: usize,
    /// Vertexes deleted. Lower than `vertexes_scanned` when a concurrent
    /// import referenced an orphan before its batch was deleted.
    pub vertexes_deleted: usize,
    /// Delete batches issued.
    pub batches: usize,
    /// Duration of the run in milliseconds.
    pub duration_ms: u64,
}

impl VacuumResult {
    /// Returns `true` if anything was deleted.
    #[must_use]
    pub const fn has_deletions(&self) -> bool {
        self.vertexes_deleted > 0
    }

    /// Returns a human-readable summary of the vacuum result.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.vertexes_scanned == 0 {
            format!("No orphan vertexes found ({}ms)", self.duration_ms)
        } else {
            format!(
                "Deleted {} of {} orphan vertexes in {} batches ({}ms)",
                self.vertexes_deleted, self.vertexes_scanned, self.batches, self.duration_ms
            )
        }
    }
}

/// Deletes every vertex that no edge references, `batch_size` at a time
/// (capped at [`MAX_BATCH_SIZE`]).
///
/// The scan pages through orphan ids in id order and pushes them into a
/// vertex deleter; once the scan is exhausted the deleter is finished, which
/// flushes the last partial batch.
///
/// # Errors
///
/// Returns the first storage failure. Batches deleted before it stay deleted.
#[instrument(skip(store))]
pub fn vacuum(store: &SqliteQuadStore, batch_size: usize) -> Result<VacuumResult> {
    let start = Instant::now();
    let page_size = batch_size.clamp(1, MAX_BATCH_SIZE);
    let mut deleter = VertexDeleter::new(store, page_size);
    let mut scanned = 0;
    let mut after = 0_i64;

    loop {
        let page = store.with_connection(|conn| scan_orphans(conn, after, page_size))?;
        let Some(last) = page.last() else { break };
        after = last.get();
        scanned += page.len();
        let full = page.len() == page_size;
        deleter.extend(page)?;
        if !full {
            break;
        }
    }

    let deleted = deleter.finish()?;
    let result = VacuumResult {
        vertexes_scanned: scanned,
        vertexes_deleted: deleted.rows_deleted,
        batches: deleted.batches,
        duration_ms: duration_to_millis(start.elapsed()),
    };

    metrics::counter!("sqlquad_vertexes_vacuumed_total").increment(result.vertexes_deleted as u64);
    info!(
        vertexes_scanned = result.vertexes_scanned,
        vertexes_deleted = result.vertexes_deleted,
        duration_ms = result.duration_ms,
        "Vacuum completed"
    );

    Ok(result)
}

/// One page of orphan vertex ids greater than `after`.
fn scan_orphans(conn: &rusqlite::Connection, after: i64, limit: usize) -> Result<Vec<VertexId>> {
    let sql = format!(
        "SELECT id FROM vertexes WHERE id > ?1 AND {ORPHAN_CONDITION} ORDER BY id LIMIT ?2"
    );
    let mut stmt = conn
        .prepare_cached(&sql)
        .map_err(|e| storage_error("prepare_scan_orphans", &e))?;
    stmt.query_map((after, limit as i64), |row| row.get(0).map(VertexId::new))
        .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
        .map_err(|e| storage_error("scan_orphans", &e))
}
