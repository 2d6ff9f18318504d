//! # sqlquad
//!
//! A quad store that keeps RDF-style facts in `SQLite`.
//!
//! Every distinct term is stored once as a vertex; every fact is an edge
//! row of four vertex ids (subject, predicate, object, graph).
//!
//! ## Features
//!
//! - Batched streaming import with per-session term identity caching
//! - Concurrent importers that converge through unique indexes
//! - Pattern matching with exact terms and numeric/temporal literal filters
//! - Batched deletion and orphan vertex collection (vacuum)
//!
//! ## Example
//!
//! ```rust
//! use sqlquad::models::{ComparisonTest, Filter, Quad, QuadPattern, Term, XSD};
//! use sqlquad::storage::SqliteQuadStore;
//!
//! let store = SqliteQuadStore::in_memory()?;
//! store.create_tables()?;
//! store.import((0..10).map(|n| {
//!     Quad::triple(
//!         Term::named_node(format!("http://ex.com/item{n}")),
//!         Term::named_node("http://ex.com/rank"),
//!         Term::typed_literal(n.to_string(), format!("{XSD}integer")),
//!     )
//! }))?;
//!
//! let four = Term::typed_literal("4", format!("{XSD}integer"));
//! let pattern = QuadPattern::new().with_object_filter(Filter::new(ComparisonTest::Gt, four));
//! assert_eq!(store.count(&pattern)?, 5);
//! # Ok::<(), sqlquad::Error>(())
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod gc;
pub mod io;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod storage;

// Re-exports for convenience
pub use config::StoreConfig;
pub use gc::VacuumResult;
pub use models::{Quad, QuadPattern, Term};
pub use pipeline::{DeleteSummary, ImportSummary, QuadImporter};
pub use storage::SqliteQuadStore;

/// Error type for sqlquad operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Bad configuration, malformed term text or input line |
/// | `UnsupportedTermKind` | A stored or parsed term kind tag is not recognised |
/// | `UnparseableComparate` | A filter comparate has no numeric or temporal value |
/// | `UnsupportedComparison` | An unknown comparison operator name |
/// | `OperationFailed` | Database statements fail (except unique violations), I/O errors |
/// | `PipelineHalted` | Pushing into a pipeline after one of its batches failed |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - A config value is zero or over the batch size limit
    /// - Term text does not follow the term syntax
    /// - A literal carries both a datatype and a language
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Term kind tag is not one of `NamedNode`, `BlankNode`, `Literal`,
    /// `DefaultGraph`.
    #[error("unsupported term kind: {0}")]
    UnsupportedTermKind(String),

    /// A comparison filter's comparate is not a literal with a recognised
    /// numeric or temporal datatype, or its lexical form does not parse.
    #[error("cannot compare against {value:?} (datatype {datatype:?})")]
    UnparseableComparate {
        /// Lexical value of the comparate.
        value: String,
        /// Datatype of the comparate, empty if none.
        datatype: String,
    },

    /// Unknown comparison operator.
    #[error("unsupported comparison: {0}")]
    UnsupportedComparison(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - `SQLite` statements fail for any reason other than a unique violation
    /// - The database or a config/log file cannot be opened
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// The pipeline stopped after a failed batch.
    #[error("pipeline halted after a failed batch")]
    PipelineHalted,
}

/// Result type alias for sqlquad operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("test error".to_string());
        assert_eq!(err.to_string(), "invalid input: test error");

        let err = Error::OperationFailed {
            operation: "test".to_string(),
            cause: "failed".to_string(),
        };
        assert_eq!(err.to_string(), "operation 'test' failed: failed");

        let err = Error::UnparseableComparate {
            value: "four".to_string(),
            datatype: "http://www.w3.org/2001/XMLSchema#integer".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "cannot compare against \"four\" (datatype \"http://www.w3.org/2001/XMLSchema#integer\")"
        );

        assert_eq!(
            Error::UnsupportedTermKind("Quoted".to_string()).to_string(),
            "unsupported term kind: Quoted"
        );
        assert_eq!(
            Error::PipelineHalted.to_string(),
            "pipeline halted after a failed batch"
        );
    }
}
