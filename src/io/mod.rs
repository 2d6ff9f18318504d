//! Quad interchange.
//!
//! The CLI reads and writes quads as JSON Lines: one `serde` encoding of a
//! [`Quad`](crate::models::Quad) per line, with RDF/JS style `termType` tags.
//!
//! ```text
//! {"subject":{"termType":"NamedNode","value":"http://ex.com/s"},"predicate":{...},"object":{...}}
//! ```
//!
//! A missing `graph` means the default graph.

mod jsonl;

pub use jsonl::{JsonLinesReader, write_quad, write_quads};
