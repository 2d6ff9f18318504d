//! Garbage collection.
//!
//! Quad deletion leaves the vertexes of removed terms in place, so that
//! concurrent imports never lose a vertex they just resolved. [`vacuum`]
//! reclaims the vertexes nothing references any more.

mod vacuum;

pub use vacuum::{VacuumResult, vacuum};
