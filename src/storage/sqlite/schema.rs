//! Vertex and edge table definitions.
//!
//! # Schema
//!
//! - `vertexes`: one row per distinct term signature, with the literal's
//!   numeric or temporal projection pre-parsed
//! - `edges`: one row per distinct (subject, predicate, object, graph) of
//!   vertex identities

use super::connection::storage_error;
use crate::Result;
use rusqlite::Connection;

const CREATE_VERTEXES: &str = "CREATE TABLE IF NOT EXISTS vertexes (
    id INTEGER PRIMARY KEY,
    term_type TEXT NOT NULL
        CHECK (term_type IN ('NamedNode', 'BlankNode', 'Literal', 'DefaultGraph')),
    value TEXT NOT NULL,
    language TEXT,
    datatype TEXT,
    value_numeric REAL,
    value_datetime INTEGER
)";

const CREATE_UNIQUE_VERTEXES: &str = "CREATE UNIQUE INDEX IF NOT EXISTS idx_unique_vertexes
    ON vertexes (term_type, value, coalesce(datatype, language, ''))";

const CREATE_EDGES: &str = "CREATE TABLE IF NOT EXISTS edges (
    id INTEGER PRIMARY KEY,
    subject INTEGER NOT NULL REFERENCES vertexes(id),
    predicate INTEGER NOT NULL REFERENCES vertexes(id),
    object INTEGER NOT NULL REFERENCES vertexes(id),
    graph INTEGER NOT NULL REFERENCES vertexes(id)
)";

const CREATE_UNIQUE_EDGES: &str = "CREATE UNIQUE INDEX IF NOT EXISTS idx_unique_edges
    ON edges (subject, predicate, object, graph)";

/// Secondary indexes: one per position not led by the unique index, so that
/// pattern joins and the vacuum anti-join stay index lookups.
const SECONDARY_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_edges_predicate ON edges (predicate)",
    "CREATE INDEX IF NOT EXISTS idx_edges_object ON edges (object)",
    "CREATE INDEX IF NOT EXISTS idx_edges_graph ON edges (graph)",
    "CREATE INDEX IF NOT EXISTS idx_vertexes_numeric ON vertexes (value_numeric)
        WHERE value_numeric IS NOT NULL",
    "CREATE INDEX IF NOT EXISTS idx_vertexes_datetime ON vertexes (value_datetime)
        WHERE value_datetime IS NOT NULL",
];

/// Creates both tables and their indexes. Idempotent.
///
/// # Errors
///
/// Returns an error if any statement fails; the whole creation is rolled back.
pub fn create_tables(conn: &mut Connection) -> Result<()> {
    let tx = conn
        .transaction()
        .map_err(|e| storage_error("create_tables_begin", &e))?;

    for (operation, sql) in [
        ("create_vertexes_table", CREATE_VERTEXES),
        ("create_unique_vertexes_index", CREATE_UNIQUE_VERTEXES),
        ("create_edges_table", CREATE_EDGES),
        ("create_unique_edges_index", CREATE_UNIQUE_EDGES),
    ] {
        tx.execute(sql, []).map_err(|e| storage_error(operation, &e))?;
    }
    for sql in SECONDARY_INDEXES {
        tx.execute(sql, [])
            .map_err(|e| storage_error("create_secondary_index", &e))?;
    }

    tx.commit().map_err(|e| storage_error("create_tables_commit", &e))
}

/// Drops both tables (edges first, they reference vertexes).
///
/// # Errors
///
/// Returns an error if a drop statement fails.
pub fn drop_tables(conn: &mut Connection) -> Result<()> {
    let tx = conn
        .transaction()
        .map_err(|e| storage_error("drop_tables_begin", &e))?;
    tx.execute_batch("DROP TABLE IF EXISTS edges; DROP TABLE IF EXISTS vertexes;")
        .map_err(|e| storage_error("drop_tables", &e))?;
    tx.commit().map_err(|e| storage_error("drop_tables_commit", &e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap()
    }

    #[test]
    fn test_create_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        create_tables(&mut conn).unwrap();
        create_tables(&mut conn).unwrap();
        assert_eq!(table_names(&conn), vec!["edges", "vertexes"]);
    }

    #[test]
    fn test_unique_signature_index() {
        let mut conn = Connection::open_in_memory().unwrap();
        create_tables(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO vertexes (term_type, value, language) VALUES ('Literal', 'a', 'en')",
            [],
        )
        .unwrap();
        // Same value, different language: distinct signature.
        conn.execute(
            "INSERT INTO vertexes (term_type, value, language) VALUES ('Literal', 'a', 'fr')",
            [],
        )
        .unwrap();
        let duplicate = conn.execute(
            "INSERT INTO vertexes (term_type, value, language) VALUES ('Literal', 'a', 'en')",
            [],
        );
        assert!(duplicate.is_err());

        let bad_kind = conn.execute(
            "INSERT INTO vertexes (term_type, value) VALUES ('Variable', 'x')",
            [],
        );
        assert!(bad_kind.is_err());
    }

    #[test]
    fn test_drop_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        create_tables(&mut conn).unwrap();
        drop_tables(&mut conn).unwrap();
        assert!(table_names(&conn).is_empty());
        drop_tables(&mut conn).unwrap();
    }
}
