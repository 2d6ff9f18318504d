//! Lazy stream of matching quads.

// Page sizes fit comfortably in i64.
#![allow(clippy::cast_possible_wrap)]

use crate::models::Quad;
use crate::storage::sqlite::{PatternQuery, QuadRow, SqliteQuadStore, storage_error};
use crate::Result;
use rusqlite::params_from_iter;
use rusqlite::types::Value;
use std::collections::VecDeque;

/// Iterator over the quads matching a pattern.
///
/// Rows are fetched a page at a time, keyed on the last edge id seen, so the
/// connection is only locked while a page is read. Quads inserted behind the
/// cursor during iteration are not seen; quads ahead of it are.
///
/// The first error (a failed page read or an unrecognised stored term kind)
/// is yielded once, after which the stream is exhausted.
pub struct QuadStream<'a> {
    store: &'a SqliteQuadStore,
    query: PatternQuery,
    sql: String,
    page_size: usize,
    after: i64,
    page: VecDeque<QuadRow>,
    exhausted: bool,
}

impl<'a> QuadStream<'a> {
    pub(crate) fn new(store: &'a SqliteQuadStore, query: PatternQuery, page_size: usize) -> Self {
        let sql = query.select_quads_page_sql();
        let page_size = page_size.max(1);
        Self {
            store,
            query,
            sql,
            page_size,
            after: 0,
            page: VecDeque::with_capacity(page_size),
            exhausted: false,
        }
    }

    fn fetch_page(&mut self) -> Result<()> {
        let params = self.query.params_with(&[
            Value::Integer(self.after),
            Value::Integer(self.page_size as i64),
        ]);
        let sql = &self.sql;
        let rows = self.store.with_connection(|conn| {
            let mut stmt = conn
                .prepare_cached(sql)
                .map_err(|e| storage_error("prepare_match_quads", &e))?;
            stmt.query_map(params_from_iter(params), QuadRow::from_row)
                .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
                .map_err(|e| storage_error("select_match_quads", &e))
        })?;

        if rows.len() < self.page_size {
            self.exhausted = true;
        }
        if let Some(last) = rows.last() {
            self.after = last.edge_id;
        }
        self.page.extend(rows);
        Ok(())
    }

    /// Collects the remaining quads.
    ///
    /// # Errors
    ///
    /// Returns the first error the stream yields.
    pub fn try_collect(self) -> Result<Vec<Quad>> {
        self.collect()
    }
}

impl Iterator for QuadStream<'_> {
    type Item = Result<Quad>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.page.is_empty() {
            if self.exhausted {
                return None;
            }
            if let Err(e) = self.fetch_page() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }

        let row = self.page.pop_front()?;
        match row.materialize() {
            Ok(quad) => Some(Ok(quad)),
            Err(e) => {
                self.exhausted = true;
                self.page.clear();
                Some(Err(e))
            },
        }
    }
}
