//! Term identity cache.
//!
//! Maps a term's [`TermSignature`] to the vertex it was resolved to, so that
//! frequently reused terms (predicates, graphs) skip the insert/fetch round
//! trip. Correctness never depends on a hit: the unique index on `vertexes`
//! is the authority.

use crate::models::{Term, TermSignature, Vertex};
use lru::LruCache;
use std::num::NonZeroUsize;

/// Default maximum number of cached terms.
pub const DEFAULT_CACHE_CAPACITY: usize = 100_000;

/// Bounded LRU cache of resolved vertexes, owned by one import session.
///
/// # Thread Safety
///
/// Not synchronised. Each [`QuadImporter`](crate::pipeline::QuadImporter)
/// owns its own instance; caches are never shared between pipelines.
pub struct TermVertexCache {
    entries: LruCache<TermSignature, Vertex>,
}

impl TermVertexCache {
    /// Creates a cache holding at most `capacity` entries (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Looks up a term, marking it most recently used.
    pub fn get(&mut self, term: &Term) -> Option<&Vertex> {
        self.entries.get(&term.signature())
    }

    /// Looks up by precomputed signature.
    pub fn get_by_signature(&mut self, signature: &TermSignature) -> Option<&Vertex> {
        self.entries.get(signature)
    }

    /// Records the vertex a term resolved to, evicting the least recently
    /// used entry when full.
    pub fn set(&mut self, term: &Term, vertex: Vertex) {
        self.entries.put(term.signature(), vertex);
    }

    /// Records a vertex under a precomputed signature.
    pub fn set_by_signature(&mut self, signature: TermSignature, vertex: Vertex) {
        self.entries.put(signature, vertex);
    }

    /// Releases every entry.
    pub fn destroy(&mut self) {
        self.entries.clear();
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}

impl Default for TermVertexCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
