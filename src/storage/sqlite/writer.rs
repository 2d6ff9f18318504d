//! The batched insert cycle and batched deletes.
//!
//! A batch of quads is resolved to vertex identities (cache first, then one
//! multi-row insert for the misses), and the resulting edge rows are written
//! with one multi-row insert. Unique violations on either table are resolved
//! by falling back to row-at-a-time statements; any other failure is returned.

// Row counts from SQLite are non-negative and bounded by the batch size.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]

use super::connection::{is_unique_violation, storage_error};
use super::sql::{PatternQuery, numbered_placeholders};
use super::vertex_row::{INSERT_COLUMNS, VERTEX_COLUMNS, VertexRow, insert_values};
use crate::models::{EdgeId, Quad, QuadPattern, Term, TermSignature, Vertex, VertexId};
use crate::storage::cache::TermVertexCache;
use crate::{Error, Result};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params_from_iter};
use std::collections::{HashMap, HashSet};

/// A vertex that no edge references in any of the four roles.
///
/// Used unqualified against `vertexes`, both by the vacuum scan and by the
/// vertex delete statement.
pub const ORPHAN_CONDITION: &str = "NOT EXISTS (SELECT 1 FROM edges WHERE edges.subject = vertexes.id) \
     AND NOT EXISTS (SELECT 1 FROM edges WHERE edges.predicate = vertexes.id) \
     AND NOT EXISTS (SELECT 1 FROM edges WHERE edges.object = vertexes.id) \
     AND NOT EXISTS (SELECT 1 FROM edges WHERE edges.graph = vertexes.id)";

/// Counters for one run of the insert cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Distinct terms in the batch resolved from the identity cache; repeats
    /// within the batch are counted once.
    pub cache_hits: usize,
    /// Vertexes created by this batch.
    pub vertexes_inserted: usize,
    /// Vertexes that already existed and were fetched after a conflict.
    pub vertex_conflicts: usize,
    /// Edges created by this batch.
    pub edges_inserted: usize,
    /// Edges that already existed.
    pub duplicate_edges: usize,
}

/// Vertexes resolved by an insert attempt.
#[derive(Debug, Default)]
struct Resolved {
    vertexes: Vec<Vertex>,
    inserted: usize,
    conflicts: usize,
}

/// Runs the insert cycle for `quads`.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] on any storage failure other than a
/// unique violation.
pub fn insert_quads(
    conn: &Connection,
    cache: &mut TermVertexCache,
    quads: &[Quad],
) -> Result<BatchStats> {
    let mut stats = BatchStats::default();
    if quads.is_empty() {
        return Ok(stats);
    }

    let mut ids: HashMap<TermSignature, VertexId> = HashMap::new();
    let mut pending: HashSet<TermSignature> = HashSet::new();
    let mut misses: Vec<&Term> = Vec::new();

    for term in quads.iter().flat_map(Quad::terms) {
        let signature = term.signature();
        if ids.contains_key(&signature) || pending.contains(&signature) {
            continue;
        }
        if let Some(vertex) = cache.get_by_signature(&signature) {
            stats.cache_hits += 1;
            ids.insert(signature, vertex.id);
        } else {
            pending.insert(signature);
            misses.push(term);
        }
    }

    if !misses.is_empty() {
        let resolved = insert_many_vertexes(conn, &misses)?;
        stats.vertexes_inserted = resolved.inserted;
        stats.vertex_conflicts = resolved.conflicts;
        for vertex in resolved.vertexes {
            let signature = vertex.term.signature();
            ids.insert(signature.clone(), vertex.id);
            cache.set_by_signature(signature, vertex);
        }
    }

    let mut rows = Vec::with_capacity(quads.len());
    for quad in quads {
        let mut row = [0_i64; 4];
        for (slot, term) in row.iter_mut().zip(quad.terms()) {
            let id = ids.get(&term.signature()).ok_or_else(|| Error::OperationFailed {
                operation: "resolve_vertex".to_string(),
                cause: format!("no vertex resolved for {term}"),
            })?;
            *slot = id.get();
        }
        rows.push(row);
    }

    let inserted = insert_many_edges(conn, &rows)?;
    stats.edges_inserted = inserted;
    stats.duplicate_edges = rows.len() - inserted;

    metrics::counter!("sqlquad_vertexes_inserted_total").increment(stats.vertexes_inserted as u64);
    metrics::counter!("sqlquad_edges_inserted_total").increment(stats.edges_inserted as u64);
    tracing::debug!(
        quads = quads.len(),
        cache_hits = stats.cache_hits,
        vertexes_inserted = stats.vertexes_inserted,
        vertex_conflicts = stats.vertex_conflicts,
        edges_inserted = stats.edges_inserted,
        duplicate_edges = stats.duplicate_edges,
        "Flushed import batch"
    );

    Ok(stats)
}

/// Inserts distinct terms with one statement, falling back to one statement
/// per term on a unique violation.
fn insert_many_vertexes(conn: &Connection, terms: &[&Term]) -> Result<Resolved> {
    let values_clause: Vec<String> = (0..terms.len())
        .map(|i| format!("({})", numbered_placeholders(i * 6, 6)))
        .collect();
    let sql = format!(
        "INSERT INTO vertexes ({INSERT_COLUMNS}) VALUES {} RETURNING {VERTEX_COLUMNS}",
        values_clause.join(", ")
    );
    let params: Vec<Value> = terms.iter().flat_map(|term| insert_values(term)).collect();

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| storage_error("prepare_insert_vertexes", &e))?;
    let rows = stmt
        .query_map(params_from_iter(params.iter()), |row| VertexRow::from_row(row, 0))
        .and_then(|mapped| mapped.collect::<rusqlite::Result<Vec<_>>>());

    match rows {
        Ok(rows) => {
            // RETURNING order is unspecified; callers key by signature.
            let vertexes = rows
                .into_iter()
                .map(VertexRow::into_vertex)
                .collect::<Result<Vec<_>>>()?;
            Ok(Resolved {
                inserted: vertexes.len(),
                vertexes,
                conflicts: 0,
            })
        },
        Err(e) if is_unique_violation(&e) => {
            tracing::warn!(
                vertexes = terms.len(),
                "Vertex batch conflicted, falling back to single inserts"
            );
            metrics::counter!("sqlquad_unique_conflicts_total", "table" => "vertexes")
                .increment(1);
            let mut resolved = Resolved::default();
            for term in terms {
                let (vertex, inserted) = insert_one_vertex(conn, term)?;
                if inserted {
                    resolved.inserted += 1;
                } else {
                    resolved.conflicts += 1;
                }
                resolved.vertexes.push(vertex);
            }
            Ok(resolved)
        },
        Err(e) => Err(storage_error("insert_vertexes", &e)),
    }
}

/// Inserts one term, or fetches the existing vertex with its signature.
///
/// Returns the vertex and whether it was created.
fn insert_one_vertex(conn: &Connection, term: &Term) -> Result<(Vertex, bool)> {
    let sql = format!(
        "INSERT INTO vertexes ({INSERT_COLUMNS}) VALUES ({}) RETURNING {VERTEX_COLUMNS}",
        numbered_placeholders(0, 6)
    );
    let mut stmt = conn
        .prepare_cached(&sql)
        .map_err(|e| storage_error("prepare_insert_vertex", &e))?;

    match stmt.query_row(params_from_iter(insert_values(term)), |row| {
        VertexRow::from_row(row, 0)
    }) {
        Ok(row) => Ok((row.into_vertex()?, true)),
        Err(e) if is_unique_violation(&e) => {
            let vertex = fetch_vertex_by_signature(conn, &term.signature())?.ok_or_else(|| {
                Error::OperationFailed {
                    operation: "fetch_conflicting_vertex".to_string(),
                    cause: format!("vertex for {term} conflicted but no longer exists"),
                }
            })?;
            Ok((vertex, false))
        },
        Err(e) => Err(storage_error("insert_vertex", &e)),
    }
}

/// Looks up the vertex stored under `signature`.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if the query fails, or
/// [`Error::UnsupportedTermKind`] if the stored kind tag is unknown.
pub fn fetch_vertex_by_signature(
    conn: &Connection,
    signature: &TermSignature,
) -> Result<Option<Vertex>> {
    let sql = format!(
        "SELECT {VERTEX_COLUMNS} FROM vertexes \
         WHERE term_type = ?1 AND value = ?2 AND coalesce(datatype, language, '') = ?3"
    );
    let row = conn
        .prepare_cached(&sql)
        .and_then(|mut stmt| {
            stmt.query_row(
                (signature.kind.as_str(), &signature.value, &signature.tag),
                |row| VertexRow::from_row(row, 0),
            )
            .optional()
        })
        .map_err(|e| storage_error("fetch_vertex_by_signature", &e))?;

    row.map(VertexRow::into_vertex).transpose()
}

/// Inserts edge rows with one statement, falling back to one statement per
/// row on a unique violation. Returns the number of rows created.
fn insert_many_edges(conn: &Connection, rows: &[[i64; 4]]) -> Result<usize> {
    let values_clause: Vec<String> = (0..rows.len())
        .map(|i| format!("({})", numbered_placeholders(i * 4, 4)))
        .collect();
    let sql = format!(
        "INSERT INTO edges (subject, predicate, object, graph) VALUES {}",
        values_clause.join(", ")
    );
    let params = rows.iter().flatten();

    match conn.execute(&sql, params_from_iter(params)) {
        Ok(inserted) => Ok(inserted),
        Err(e) if is_unique_violation(&e) => {
            tracing::warn!(
                edges = rows.len(),
                "Edge batch conflicted, falling back to single inserts"
            );
            metrics::counter!("sqlquad_unique_conflicts_total", "table" => "edges").increment(1);
            let mut inserted = 0;
            for row in rows {
                if insert_one_edge(conn, row)? {
                    inserted += 1;
                }
            }
            Ok(inserted)
        },
        Err(e) => Err(storage_error("insert_edges", &e)),
    }
}

/// Inserts one edge row. Returns `false` if it already existed.
fn insert_one_edge(conn: &Connection, row: &[i64; 4]) -> Result<bool> {
    let result = conn
        .prepare_cached("INSERT INTO edges (subject, predicate, object, graph) VALUES (?1, ?2, ?3, ?4)")
        .and_then(|mut stmt| stmt.execute(params_from_iter(row.iter())));

    match result {
        Ok(_) => Ok(true),
        Err(e) if is_unique_violation(&e) => Ok(false),
        Err(e) => Err(storage_error("insert_edge", &e)),
    }
}

/// Deletes edges by id. Returns the number of rows removed.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if the statement fails.
pub fn delete_edges(conn: &Connection, ids: &[EdgeId]) -> Result<usize> {
    if ids.is_empty() {
        return Ok(0);
    }
    let sql = format!(
        "DELETE FROM edges WHERE id IN ({})",
        numbered_placeholders(0, ids.len())
    );
    let deleted = conn
        .execute(&sql, params_from_iter(ids.iter().map(|id| id.get())))
        .map_err(|e| storage_error("delete_edges", &e))?;

    metrics::counter!("sqlquad_edges_deleted_total").increment(deleted as u64);
    Ok(deleted)
}

/// Deletes vertexes by id, skipping any still referenced by an edge.
/// Returns the number of rows removed.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if the statement fails.
pub fn delete_vertexes(conn: &Connection, ids: &[VertexId]) -> Result<usize> {
    if ids.is_empty() {
        return Ok(0);
    }
    let sql = format!(
        "DELETE FROM vertexes WHERE id IN ({}) AND {ORPHAN_CONDITION}",
        numbered_placeholders(0, ids.len())
    );
    conn.execute(&sql, params_from_iter(ids.iter().map(|id| id.get())))
        .map_err(|e| storage_error("delete_vertexes", &e))
}

/// Deletes every edge exactly matching each quad, in one transaction.
/// Returns the number of rows removed.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if a statement fails; nothing from
/// the batch is removed in that case.
pub fn remove_quads(conn: &mut Connection, quads: &[Quad]) -> Result<usize> {
    let tx = conn
        .transaction()
        .map_err(|e| storage_error("remove_quads_begin", &e))?;
    let mut deleted = 0;
    for quad in quads {
        deleted += delete_matching(&tx, &QuadPattern::exact(quad))?;
    }
    tx.commit()
        .map_err(|e| storage_error("remove_quads_commit", &e))?;

    metrics::counter!("sqlquad_edges_deleted_total").increment(deleted as u64);
    Ok(deleted)
}

/// Deletes every edge matching `pattern` with one statement.
///
/// # Errors
///
/// Returns [`Error::UnparseableComparate`] for a malformed pattern, or
/// [`Error::OperationFailed`] if the statement fails.
pub fn delete_matching(conn: &Connection, pattern: &QuadPattern) -> Result<usize> {
    let query = PatternQuery::compile(pattern)?;
    conn.execute(&query.delete_sql(), params_from_iter(query.params()))
        .map_err(|e| storage_error("delete_matching", &e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::sqlite::schema::create_tables;

    fn setup() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", "ON").unwrap();
        create_tables(&mut conn).unwrap();
        conn
    }

    fn quad(s: &str, p: &str, o: Term) -> Quad {
        Quad::triple(Term::named_node(s), Term::named_node(p), o)
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_insert_dedupes_terms_within_batch() {
        let conn = setup();
        let mut cache = TermVertexCache::new(16);
        let quads = vec![
            quad("s", "p", Term::literal("a")),
            quad("s", "p", Term::literal("b")),
        ];

        let stats = insert_quads(&conn, &mut cache, &quads).unwrap();
        // s, p, a, b, default graph
        assert_eq!(stats.vertexes_inserted, 5);
        assert_eq!(stats.edges_inserted, 2);
        assert_eq!(cache.len(), 5);
        assert_eq!(count(&conn, "vertexes"), 5);
    }

    #[test]
    fn test_second_batch_hits_cache() {
        let conn = setup();
        let mut cache = TermVertexCache::new(16);
        let quads = vec![quad("s", "p", Term::literal("a"))];
        insert_quads(&conn, &mut cache, &quads).unwrap();

        let stats = insert_quads(&conn, &mut cache, &quads).unwrap();
        assert_eq!(stats.cache_hits, 4);
        assert_eq!(stats.vertexes_inserted, 0);
        assert_eq!(stats.edges_inserted, 0);
        assert_eq!(stats.duplicate_edges, 1);
        assert_eq!(count(&conn, "edges"), 1);
    }

    #[test]
    fn test_cache_hits_count_distinct_terms() {
        let conn = setup();
        let mut cache = TermVertexCache::new(16);
        insert_quads(&conn, &mut cache, &[quad("s", "p", Term::literal("a"))]).unwrap();

        // s, p, "a" and the default graph repeat across both quads.
        let quads = vec![
            quad("s", "p", Term::literal("a")),
            quad("s", "p", Term::literal("b")),
        ];
        let stats = insert_quads(&conn, &mut cache, &quads).unwrap();
        assert_eq!(stats.cache_hits, 4);
        assert_eq!(stats.vertexes_inserted, 1);
    }

    #[test]
    fn test_conflict_with_cold_cache_fetches_existing() {
        let conn = setup();
        let quads = vec![quad("s", "p", Term::literal("a"))];
        insert_quads(&conn, &mut TermVertexCache::new(16), &quads).unwrap();

        let mut cold = TermVertexCache::new(16);
        let more = vec![
            quad("s", "p", Term::literal("a")),
            quad("s", "p", Term::language_literal("a", "en")),
        ];
        let stats = insert_quads(&conn, &mut cold, &more).unwrap();
        assert_eq!(stats.vertex_conflicts, 4);
        assert_eq!(stats.vertexes_inserted, 1);
        assert_eq!(stats.edges_inserted, 1);
        assert_eq!(stats.duplicate_edges, 1);
        assert_eq!(count(&conn, "vertexes"), 5);
        assert_eq!(count(&conn, "edges"), 2);
    }

    #[test]
    fn test_duplicate_quads_in_one_batch() {
        let conn = setup();
        let q = quad("s", "p", Term::literal("a"));
        let stats =
            insert_quads(&conn, &mut TermVertexCache::new(16), &[q.clone(), q]).unwrap();
        assert_eq!(stats.edges_inserted, 1);
        assert_eq!(stats.duplicate_edges, 1);
    }

    #[test]
    fn test_fetch_vertex_by_signature() {
        let conn = setup();
        let term = Term::typed_literal("5", format!("{}int", crate::models::XSD));
        insert_quads(
            &conn,
            &mut TermVertexCache::new(16),
            &[quad("s", "p", term.clone())],
        )
        .unwrap();

        let vertex = fetch_vertex_by_signature(&conn, &term.signature())
            .unwrap()
            .unwrap();
        assert_eq!(vertex.term, term);
        assert_eq!(vertex.projection.and_then(|p| p.numeric()), Some(5.0));
        assert!(
            fetch_vertex_by_signature(&conn, &Term::literal("5").signature())
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_delete_vertexes_keeps_referenced() {
        let conn = setup();
        insert_quads(
            &conn,
            &mut TermVertexCache::new(16),
            &[quad("s", "p", Term::literal("a"))],
        )
        .unwrap();
        let ids: Vec<VertexId> = conn
            .prepare("SELECT id FROM vertexes")
            .unwrap()
            .query_map([], |row| row.get(0).map(VertexId::new))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();

        assert_eq!(delete_vertexes(&conn, &ids).unwrap(), 0);
        conn.execute("DELETE FROM edges", []).unwrap();
        assert_eq!(delete_vertexes(&conn, &ids).unwrap(), 4);
    }

    #[test]
    fn test_remove_quads_exact_match() {
        let mut conn = setup();
        let a = quad("s", "p", Term::literal("a"));
        let b = quad("s", "p", Term::language_literal("a", "en"));
        insert_quads(&conn, &mut TermVertexCache::new(16), &[a.clone(), b]).unwrap();

        assert_eq!(remove_quads(&mut conn, &[a.clone()]).unwrap(), 1);
        assert_eq!(remove_quads(&mut conn, &[a]).unwrap(), 0);
        assert_eq!(count(&conn, "edges"), 1);
        // Vertexes are never cascaded.
        assert_eq!(count(&conn, "vertexes"), 5);
    }

    #[test]
    fn test_delete_edges_by_id() {
        let conn = setup();
        insert_quads(
            &conn,
            &mut TermVertexCache::new(16),
            &[quad("s", "p", Term::literal("a"))],
        )
        .unwrap();
        let id: i64 = conn
            .query_row("SELECT id FROM edges", [], |row| row.get(0))
            .unwrap();
        assert_eq!(delete_edges(&conn, &[EdgeId::new(id), EdgeId::new(id + 100)]).unwrap(), 1);
        assert_eq!(delete_edges(&conn, &[]).unwrap(), 0);
    }
}
