//! `SQLite` quad store.
//!
//! Owns one connection behind a mutex. Every operation locks it for a single
//! statement or batch, so pipelines on the same store interleave between
//! batches, and stores opened on the same file serialise writes in `SQLite`.

// SQLite counts are i64 but never negative.
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_possible_truncation)]

use super::connection::{acquire_lock, configure_connection, storage_error};
use super::schema;
use super::sql::{PatternQuery, SAMPLE_MODULUS};
use crate::config::StoreConfig;
use crate::gc::{VacuumResult, vacuum};
use crate::models::{EdgeId, Quad, QuadPattern, Term};
use crate::pipeline::{
    DeleteSummary, EdgeDeleter, ImportSummary, QuadImporter, QuadRemover, QuadStream,
};
use crate::{Error, Result};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params_from_iter};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::instrument;

/// Quad store over `vertexes` and `edges` tables.
///
/// # Concurrency Model
///
/// Uses a `Mutex<Connection>` for thread-safe access. WAL mode and
/// `busy_timeout` let several stores share one database file.
pub struct SqliteQuadStore {
    /// Connection to the `SQLite` database.
    conn: Mutex<Connection>,
    /// Settings for pipelines started from this store.
    config: StoreConfig,
    /// Path to the database (None for in-memory).
    db_path: Option<PathBuf>,
}

impl SqliteQuadStore {
    /// Opens (or creates) the database file at `path` with default settings.
    ///
    /// Tables are not created; call [`Self::create_tables`].
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or configured.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::from_config(StoreConfig::default().with_db_path(path))
    }

    /// Opens the database named by `config.db_path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the configuration is invalid, or an
    /// error if the database cannot be opened or configured.
    pub fn from_config(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let db_path = config.db_path.clone();
        let conn = Connection::open(&db_path).map_err(|e| Error::OperationFailed {
            operation: "open_quad_store".to_string(),
            cause: format!("{}: {e}", db_path.display()),
        })?;
        configure_connection(&conn, config.busy_timeout_ms)?;

        tracing::debug!(path = %db_path.display(), "Opened quad store");
        Ok(Self {
            conn: Mutex::new(conn),
            config,
            db_path: Some(db_path),
        })
    }

    /// Opens a private in-memory database with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn in_memory() -> Result<Self> {
        Self::in_memory_with_config(StoreConfig::default())
    }

    /// Opens a private in-memory database; `config.db_path` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the configuration is invalid, or an
    /// error if the database cannot be opened.
    pub fn in_memory_with_config(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let conn = Connection::open_in_memory()
            .map_err(|e| storage_error("open_quad_store_in_memory", &e))?;
        configure_connection(&conn, config.busy_timeout_ms)?;

        Ok(Self {
            conn: Mutex::new(conn),
            config,
            db_path: None,
        })
    }

    /// Returns the database path.
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Returns the store's settings.
    #[must_use]
    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Runs `f` with the connection locked.
    pub(crate) fn with_connection<R>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<R>,
    ) -> Result<R> {
        let mut conn = acquire_lock(&self.conn);
        f(&mut conn)
    }

    /// Creates the tables and indexes. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if a statement fails.
    #[instrument(skip(self))]
    pub fn create_tables(&self) -> Result<()> {
        self.with_connection(schema::create_tables)
    }

    /// Drops both tables and everything in them.
    ///
    /// # Errors
    ///
    /// Returns an error if a statement fails.
    #[instrument(skip(self))]
    pub fn drop_tables(&self) -> Result<()> {
        self.with_connection(schema::drop_tables)
    }

    /// Counts the quads matching `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnparseableComparate`] for a malformed pattern, or
    /// [`Error::OperationFailed`] if the query fails.
    #[instrument(skip(self, pattern))]
    pub fn count(&self, pattern: &QuadPattern) -> Result<u64> {
        let query = PatternQuery::compile(pattern)?;
        self.run_count(&query, false)
    }

    /// Approximately counts the quads matching `pattern`.
    ///
    /// When the edge table is estimated to hold more than
    /// `estimate_threshold` rows, counts the edges whose id is a multiple of
    /// 100 and scales the result; otherwise counts exactly.
    ///
    /// # Errors
    ///
    /// See [`Self::count`].
    #[instrument(skip(self, pattern))]
    pub fn count_estimate(&self, pattern: &QuadPattern) -> Result<u64> {
        let query = PatternQuery::compile(pattern)?;
        let table_size = self.estimated_edge_rows()?;
        if table_size <= self.config.estimate_threshold {
            return self.run_count(&query, false);
        }

        tracing::debug!(table_size, "Sampling edges for count estimate");
        Ok(self.run_count(&query, true)? * SAMPLE_MODULUS as u64)
    }

    fn run_count(&self, query: &PatternQuery, sampled: bool) -> Result<u64> {
        let sql = query.count_sql(sampled);
        let count: i64 = self.with_connection(|conn| {
            conn.query_row(&sql, params_from_iter(query.params()), |row| row.get(0))
                .map_err(|e| storage_error("count_matches", &e))
        })?;
        Ok(count as u64)
    }

    /// Edge table size from `sqlite_stat1`, else the highest edge id.
    fn estimated_edge_rows(&self) -> Result<u64> {
        self.with_connection(|conn| {
            let has_stats: bool = conn
                .query_row(
                    "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE name = 'sqlite_stat1')",
                    [],
                    |row| row.get(0),
                )
                .map_err(|e| storage_error("check_statistics", &e))?;

            if has_stats {
                let stat: Option<String> = conn
                    .query_row(
                        "SELECT stat FROM sqlite_stat1 WHERE tbl = 'edges' LIMIT 1",
                        [],
                        |row| row.get(0),
                    )
                    .optional()
                    .map_err(|e| storage_error("read_statistics", &e))?;
                // The first field of `stat` is the row count of the table.
                if let Some(rows) = stat
                    .as_deref()
                    .and_then(|s| s.split_whitespace().next())
                    .and_then(|n| n.parse::<u64>().ok())
                {
                    return Ok(rows);
                }
            }

            let max_id: Option<i64> = conn
                .query_row("SELECT MAX(id) FROM edges", [], |row| row.get(0))
                .map_err(|e| storage_error("max_edge_id", &e))?;
            Ok(max_id.unwrap_or(0) as u64)
        })
    }

    /// Refreshes the statistics used by [`Self::count_estimate`].
    ///
    /// # Errors
    ///
    /// Returns an error if `ANALYZE` fails.
    #[instrument(skip(self))]
    pub fn analyze(&self) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute_batch("ANALYZE edges; ANALYZE vertexes;")
                .map_err(|e| storage_error("analyze", &e))
        })
    }

    /// Streams the quads matching `pattern`, in edge insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnparseableComparate`] for a malformed pattern; no
    /// statement has run in that case.
    pub fn matches(&self, pattern: &QuadPattern) -> Result<QuadStream<'_>> {
        let query = PatternQuery::compile(pattern)?;
        Ok(QuadStream::new(self, query, self.config.stream_page_size))
    }

    /// Starts an import pipeline with the configured batch size.
    #[must_use]
    pub fn importer(&self) -> QuadImporter<'_> {
        QuadImporter::new(self, self.config.import_batch_size, self.config.cache_capacity)
    }

    /// Imports every quad, then finishes the pipeline.
    ///
    /// # Errors
    ///
    /// Returns the first storage failure; batches flushed before it remain.
    #[instrument(skip(self, quads))]
    pub fn import(&self, quads: impl IntoIterator<Item = Quad>) -> Result<ImportSummary> {
        let mut importer = self.importer();
        importer.extend(quads)?;
        importer.finish()
    }

    /// Imports quads from a fallible source.
    ///
    /// A source error ends the import: quads received before it are
    /// flushed, then the source error is returned.
    ///
    /// # Errors
    ///
    /// Returns the source error, or the first storage failure.
    #[instrument(skip(self, quads))]
    pub fn import_stream(
        &self,
        quads: impl IntoIterator<Item = Result<Quad>>,
    ) -> Result<ImportSummary> {
        self.importer().import_stream(quads)
    }

    /// Removes every stored quad equal to one of `quads`.
    ///
    /// Deleting never touches vertexes; see [`Self::vacuum`].
    ///
    /// # Errors
    ///
    /// Returns the first storage failure.
    #[instrument(skip(self, quads))]
    pub fn remove(&self, quads: impl IntoIterator<Item = Quad>) -> Result<DeleteSummary> {
        let mut remover = QuadRemover::new(self, self.config.delete_batch_size);
        remover.extend(quads)?;
        remover.finish()
    }

    /// Removes every quad matching `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnparseableComparate`] for a malformed pattern, or
    /// the first storage failure.
    #[instrument(skip(self, pattern))]
    pub fn remove_matches(&self, pattern: &QuadPattern) -> Result<DeleteSummary> {
        let query = PatternQuery::compile(pattern)?;
        let sql = query.select_edge_ids_page_sql();
        let page_size = self.config.stream_page_size;
        let mut deleter = EdgeDeleter::new(self, self.config.delete_batch_size);
        let mut after = 0_i64;

        loop {
            let extra = [Value::Integer(after), Value::Integer(page_size as i64)];
            let page: Vec<i64> = self.with_connection(|conn| {
                let mut stmt = conn
                    .prepare_cached(&sql)
                    .map_err(|e| storage_error("prepare_match_ids", &e))?;
                stmt.query_map(params_from_iter(query.params_with(&extra)), |row| row.get(0))
                    .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
                    .map_err(|e| storage_error("select_match_ids", &e))
            })?;

            let Some(&last) = page.last() else { break };
            after = last;
            let full = page.len() == page_size;
            deleter.extend(page.into_iter().map(EdgeId::new))?;
            if !full {
                break;
            }
        }

        deleter.finish()
    }

    /// Removes every quad in `graph`.
    ///
    /// # Errors
    ///
    /// See [`Self::remove_matches`].
    pub fn delete_graph(&self, graph: &Term) -> Result<DeleteSummary> {
        self.remove_matches(&QuadPattern::in_graph(graph.clone()))
    }

    /// Deletes every vertex no edge references.
    ///
    /// # Errors
    ///
    /// Returns the first storage failure.
    pub fn vacuum(&self) -> Result<VacuumResult> {
        vacuum(self, self.config.vacuum_batch_size)
    }

    /// Number of stored vertexes.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn vertex_count(&self) -> Result<u64> {
        self.table_count("vertexes")
    }

    /// Number of stored edges.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn edge_count(&self) -> Result<u64> {
        self.table_count("edges")
    }

    fn table_count(&self, table: &'static str) -> Result<u64> {
        let count: i64 = self.with_connection(|conn| {
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
                .map_err(|e| storage_error("table_count", &e))
        })?;
        Ok(count as u64)
    }
}
