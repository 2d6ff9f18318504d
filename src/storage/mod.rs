//! Storage layer.
//!
//! - [`cache`]: the per-import term identity cache
//! - [`sqlite`]: the `SQLite` quad store

pub mod cache;
pub mod sqlite;

pub use cache::{DEFAULT_CACHE_CAPACITY, TermVertexCache};
pub use sqlite::SqliteQuadStore;
