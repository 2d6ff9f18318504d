//! Batched delete pipelines.
//!
//! Edge and vertex deleters buffer ids and remove each batch with one
//! `DELETE ... WHERE id IN (...)`. The quad remover buffers quads and removes
//! each batch's exact matches in one transaction.

use super::{BatchPipeline, BatchSink, PipelineState};
use crate::Result;
use crate::models::{EdgeId, Quad, VertexId};
use crate::storage::sqlite::{SqliteQuadStore, writer};
use rusqlite::Connection;
use std::time::Instant;

/// Result of a delete pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteSummary {
    /// Ids or quads handed to the sink.
    pub items_received: usize,
    /// Rows removed.
    pub rows_deleted: usize,
    /// Batches written.
    pub batches: usize,
    /// Wall time from creation to `finish`.
    pub duration_ms: u64,
}

type DeleteFn<T> = fn(&mut Connection, &[T]) -> Result<usize>;

struct DeleteSink<'a, T> {
    store: &'a SqliteQuadStore,
    delete: DeleteFn<T>,
    target: &'static str,
    summary: DeleteSummary,
    started: Instant,
}

impl<T> BatchSink<T> for DeleteSink<'_, T> {
    type Summary = DeleteSummary;

    fn flush_batch(&mut self, batch: Vec<T>) -> Result<()> {
        self.summary.items_received += batch.len();
        let delete = self.delete;
        let deleted = self.store.with_connection(|conn| delete(conn, &batch))?;
        self.summary.rows_deleted += deleted;
        self.summary.batches += 1;
        tracing::debug!(target_table = self.target, items = batch.len(), deleted, "Flushed delete batch");
        Ok(())
    }

    fn close(&mut self) -> DeleteSummary {
        self.summary.duration_ms =
            u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            target_table = self.target,
            rows_deleted = self.summary.rows_deleted,
            batches = self.summary.batches,
            "Delete finished"
        );
        self.summary
    }
}

/// Batched delete pipeline over items of type `T`.
///
/// Batch sizes are capped at [`crate::config::MAX_BATCH_SIZE`].
pub struct Deleter<'a, T> {
    pipeline: BatchPipeline<T, DeleteSink<'a, T>>,
}

/// Deletes edges by id.
pub type EdgeDeleter<'a> = Deleter<'a, EdgeId>;
/// Deletes vertexes by id; referenced vertexes are kept.
pub type VertexDeleter<'a> = Deleter<'a, VertexId>;
/// Deletes stored quads equal to the given quads.
pub type QuadRemover<'a> = Deleter<'a, Quad>;

impl<'a, T> Deleter<'a, T> {
    fn with_sink(
        store: &'a SqliteQuadStore,
        batch_size: usize,
        target: &'static str,
        delete: DeleteFn<T>,
    ) -> Self {
        let sink = DeleteSink {
            store,
            delete,
            target,
            summary: DeleteSummary::default(),
            started: Instant::now(),
        };
        Self {
            pipeline: BatchPipeline::new(sink, batch_size),
        }
    }

    /// Queues an item, deleting a batch when one is full.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::PipelineHalted`] after a failed batch, or the
    /// storage error of the batch this push completed.
    pub fn push(&mut self, item: T) -> Result<()> {
        self.pipeline.push(item)
    }

    /// Queues every item.
    ///
    /// # Errors
    ///
    /// See [`Self::push`].
    pub fn extend(&mut self, items: impl IntoIterator<Item = T>) -> Result<()> {
        self.pipeline.extend(items)
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> PipelineState {
        self.pipeline.state()
    }

    /// Deletes the remaining items.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::PipelineHalted`] if a batch failed earlier, or
    /// the storage error of the final batch.
    pub fn finish(self) -> Result<DeleteSummary> {
        self.pipeline.finish()
    }
}

impl<'a> Deleter<'a, EdgeId> {
    /// Creates an edge deleter.
    #[must_use]
    pub fn new(store: &'a SqliteQuadStore, batch_size: usize) -> Self {
        Self::with_sink(store, batch_size, "edges", |conn, ids| {
            writer::delete_edges(conn, ids)
        })
    }
}

impl<'a> Deleter<'a, VertexId> {
    /// Creates a vertex deleter.
    #[must_use]
    pub fn new(store: &'a SqliteQuadStore, batch_size: usize) -> Self {
        Self::with_sink(store, batch_size, "vertexes", |conn, ids| {
            writer::delete_vertexes(conn, ids)
        })
    }
}

impl<'a> Deleter<'a, Quad> {
    /// Creates a quad remover.
    #[must_use]
    pub fn new(store: &'a SqliteQuadStore, batch_size: usize) -> Self {
        Self::with_sink(store, batch_size, "edges", writer::remove_quads)
    }
}
