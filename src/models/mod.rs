//! Data models for terms, quads, vertexes and patterns.

mod literal;
mod pattern;
mod quad;
mod term;
mod vertex;

pub use literal::{Projection, ProjectionKind, XSD};
pub use pattern::{ComparisonTest, Constraint, Filter, QuadPattern};
pub use quad::{Position, Quad};
pub use term::{Literal, LiteralTag, Term, TermKind, TermSignature};
pub use vertex::{EdgeId, Vertex, VertexId};
