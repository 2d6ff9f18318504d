//! Persisted terms and fact rows.

use super::literal::Projection;
use super::term::Term;
use std::fmt;

/// Storage identity of a vertex. Assigned once by the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(i64);

impl VertexId {
    /// Wraps a raw row id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// The raw row id.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Storage identity of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(i64);

impl EdgeId {
    /// Wraps a raw row id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// The raw row id.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// A persisted, deduplicated term.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    /// Storage identity.
    pub id: VertexId,
    /// The term.
    pub term: Term,
    /// Pre-parsed numeric or temporal value of a typed literal.
    pub projection: Option<Projection>,
}

impl Vertex {
    /// Creates a vertex, computing its projection from the term.
    #[must_use]
    pub fn new(id: VertexId, term: Term) -> Self {
        let projection = Projection::of_term(&term);
        Self {
            id,
            term,
            projection,
        }
    }
}
