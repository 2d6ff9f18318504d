//! Quad import pipeline.

use super::{BatchPipeline, BatchSink, PipelineState};
use crate::Result;
use crate::models::Quad;
use crate::storage::cache::TermVertexCache;
use crate::storage::sqlite::{SqliteQuadStore, writer};
use std::time::Instant;

/// Result of an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Quads handed to the sink.
    pub quads_received: usize,
    /// Batches written.
    pub batches: usize,
    /// Distinct terms per batch resolved from the identity cache.
    pub cache_hits: usize,
    /// Vertexes created.
    pub vertexes_inserted: usize,
    /// Vertexes found already stored after a conflict.
    pub vertex_conflicts: usize,
    /// Edges created.
    pub edges_inserted: usize,
    /// Quads that were already stored.
    pub duplicate_edges: usize,
    /// Wall time from the first push to `finish`.
    pub duration_ms: u64,
}

impl ImportSummary {
    /// Returns a human-readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.quads_received == 0 {
            return "No quads imported".to_string();
        }
        format!(
            "Imported {} quads in {} batches: {} new ({} duplicate), {} new vertexes in {}ms",
            self.quads_received,
            self.batches,
            self.edges_inserted,
            self.duplicate_edges,
            self.vertexes_inserted,
            self.duration_ms
        )
    }
}

struct ImportSink<'a> {
    store: &'a SqliteQuadStore,
    cache: TermVertexCache,
    summary: ImportSummary,
    started: Instant,
}

impl BatchSink<Quad> for ImportSink<'_> {
    type Summary = ImportSummary;

    fn flush_batch(&mut self, batch: Vec<Quad>) -> Result<()> {
        self.summary.quads_received += batch.len();
        let cache = &mut self.cache;
        let stats = self
            .store
            .with_connection(|conn| writer::insert_quads(conn, cache, &batch))?;

        self.summary.batches += 1;
        self.summary.cache_hits += stats.cache_hits;
        self.summary.vertexes_inserted += stats.vertexes_inserted;
        self.summary.vertex_conflicts += stats.vertex_conflicts;
        self.summary.edges_inserted += stats.edges_inserted;
        self.summary.duplicate_edges += stats.duplicate_edges;
        Ok(())
    }

    fn close(&mut self) -> ImportSummary {
        self.cache.destroy();
        self.summary.duration_ms =
            u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            quads = self.summary.quads_received,
            batches = self.summary.batches,
            edges_inserted = self.summary.edges_inserted,
            duration_ms = self.summary.duration_ms,
            "Import finished"
        );
        self.summary
    }
}

/// Streams quads into a store in batches.
///
/// Owns its identity cache; two importers never share one.
///
/// # Example
///
/// ```
/// use sqlquad::models::{Quad, Term};
/// use sqlquad::storage::SqliteQuadStore;
///
/// let store = SqliteQuadStore::in_memory()?;
/// store.create_tables()?;
///
/// let mut importer = store.importer();
/// importer.push(Quad::triple(
///     Term::named_node("http://ex.com/s"),
///     Term::named_node("http://ex.com/p"),
///     Term::literal("o"),
/// ))?;
/// let summary = importer.finish()?;
/// assert_eq!(summary.edges_inserted, 1);
/// # Ok::<(), sqlquad::Error>(())
/// ```
pub struct QuadImporter<'a> {
    pipeline: BatchPipeline<Quad, ImportSink<'a>>,
}

impl<'a> QuadImporter<'a> {
    /// Creates an importer writing `batch_size` quads per batch, capped at
    /// [`crate::config::MAX_BATCH_SIZE`].
    #[must_use]
    pub fn new(store: &'a SqliteQuadStore, batch_size: usize, cache_capacity: usize) -> Self {
        let sink = ImportSink {
            store,
            cache: TermVertexCache::new(cache_capacity),
            summary: ImportSummary::default(),
            started: Instant::now(),
        };
        Self {
            pipeline: BatchPipeline::new(sink, batch_size),
        }
    }

    /// Queues a quad, writing a batch when one is full.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::PipelineHalted`] after a failed batch, or the
    /// storage error of the batch this push completed.
    pub fn push(&mut self, quad: Quad) -> Result<()> {
        self.pipeline.push(quad)
    }

    /// Queues every quad.
    ///
    /// # Errors
    ///
    /// See [`Self::push`].
    pub fn extend(&mut self, quads: impl IntoIterator<Item = Quad>) -> Result<()> {
        self.pipeline.extend(quads)
    }

    /// Number of entries in the identity cache.
    #[must_use]
    pub fn cached_terms(&self) -> usize {
        self.pipeline.sink().cache.len()
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> PipelineState {
        self.pipeline.state()
    }

    /// Imports quads from a fallible source, then finishes.
    ///
    /// A source error ends the import: quads received before it are
    /// flushed, then the source error is returned.
    ///
    /// # Errors
    ///
    /// Returns the source error, or the first storage failure.
    pub fn import_stream(
        mut self,
        quads: impl IntoIterator<Item = Result<Quad>>,
    ) -> Result<ImportSummary> {
        for quad in quads {
            match quad {
                Ok(quad) => self.push(quad)?,
                Err(e) => {
                    let summary = self.finish()?;
                    tracing::warn!(
                        quads_flushed = summary.quads_received,
                        error = %e,
                        "Import source failed"
                    );
                    return Err(e);
                },
            }
        }
        self.finish()
    }

    /// Writes the remaining quads and releases the cache.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::PipelineHalted`] if a batch failed earlier, or
    /// the storage error of the final batch.
    pub fn finish(self) -> Result<ImportSummary> {
        self.pipeline.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::io::JsonLinesReader;
    use crate::models::Term;

    fn line(subject: &str) -> String {
        format!(
            r#"{{"subject":{{"termType":"NamedNode","value":"{subject}"}},"predicate":{{"termType":"NamedNode","value":"p"}},"object":{{"termType":"Literal","value":"o"}}}}"#
        )
    }

    #[test]
    fn test_import_stream_keeps_quads_before_bad_line() {
        let store = SqliteQuadStore::in_memory().unwrap();
        store.create_tables().unwrap();
        let input = format!("{}\n{}\n{{not json\n{}\n", line("a"), line("b"), line("c"));

        let importer = QuadImporter::new(&store, 1, 8);
        let err = importer
            .import_stream(JsonLinesReader::new(input.as_bytes()))
            .unwrap_err();

        assert!(matches!(err, Error::InvalidInput(ref msg) if msg.starts_with("line 3")));
        assert_eq!(store.edge_count().unwrap(), 2);
    }

    #[test]
    fn test_import_stream_uses_importer_batch_size() {
        let store = SqliteQuadStore::in_memory().unwrap();
        store.create_tables().unwrap();
        let quads = (0..5).map(|n| {
            Ok(Quad::triple(
                Term::named_node(format!("s{n}")),
                Term::named_node("p"),
                Term::literal("o"),
            ))
        });

        let summary = QuadImporter::new(&store, 2, 8).import_stream(quads).unwrap();
        assert_eq!(summary.quads_received, 5);
        assert_eq!(summary.batches, 3);
    }
}
