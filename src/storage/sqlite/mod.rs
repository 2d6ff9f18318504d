//! `SQLite` quad store backend.
//!
//! ## Module Structure
//!
//! - [`connection`]: lock acquisition, pragma configuration, constraint error classification
//! - [`schema`]: `vertexes` and `edges` tables
//! - [`sql`]: pattern compilation into joins, conditions and parameters
//! - [`vertex_row`]: row conversion for vertexes and matched quads
//! - [`writer`]: the batched insert cycle and batched deletes
//! - [`store`]: [`SqliteQuadStore`], the entry points

mod connection;
pub mod schema;
mod sql;
mod store;
mod vertex_row;
pub mod writer;

pub use connection::{
    DEFAULT_BUSY_TIMEOUT_MS, acquire_lock, configure_connection, is_unique_violation,
    storage_error,
};
pub use sql::{PatternQuery, SAMPLE_MODULUS, numbered_placeholders};
pub use store::SqliteQuadStore;
pub use vertex_row::{INSERT_COLUMNS, QuadRow, VERTEX_COLUMNS, VertexRow, insert_values};
pub use writer::{BatchStats, ORPHAN_CONDITION};
