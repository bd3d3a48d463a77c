//! Raw triple storage
//!
//! A [`TripleStore`] holds triples and nothing else: it knows nothing about
//! graph locks or mutability classes. [`Graph`](crate::Graph) wraps a store
//! and enforces both.

use parking_lot::RwLock;
use std::collections::BTreeSet;

use crate::error::GraphError;
use crate::model::{Triple, TriplePattern};

/// Backing storage for a graph.
///
/// Methods take `&self`; implementations provide their own interior
/// mutability. Callers serialize access through the owning graph's lock.
pub trait TripleStore: Send + Sync {
    /// Triples matching `pattern`, in store order.
    fn filter(&self, pattern: &TriplePattern) -> Result<Vec<Triple>, GraphError>;

    fn len(&self) -> Result<usize, GraphError>;

    fn is_empty(&self) -> Result<bool, GraphError> {
        Ok(self.len()? == 0)
    }

    fn contains(&self, triple: &Triple) -> Result<bool, GraphError>;

    /// Returns true if the triple was not already present.
    fn insert(&self, triple: Triple) -> Result<bool, GraphError>;

    /// Returns true if the triple was present.
    fn remove(&self, triple: &Triple) -> Result<bool, GraphError>;

    fn clear(&self) -> Result<(), GraphError>;
}

/// Ordered in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    triples: RwLock<BTreeSet<Triple>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FromIterator<Triple> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        Self {
            triples: RwLock::new(iter.into_iter().collect()),
        }
    }
}

impl TripleStore for MemoryStore {
    fn filter(&self, pattern: &TriplePattern) -> Result<Vec<Triple>, GraphError> {
        let triples = self.triples.read();
        if pattern.is_wildcard() {
            return Ok(triples.iter().cloned().collect());
        }
        Ok(triples
            .iter()
            .filter(|t| pattern.matches(t))
            .cloned()
            .collect())
    }

    fn len(&self) -> Result<usize, GraphError> {
        Ok(self.triples.read().len())
    }

    fn contains(&self, triple: &Triple) -> Result<bool, GraphError> {
        Ok(self.triples.read().contains(triple))
    }

    fn insert(&self, triple: Triple) -> Result<bool, GraphError> {
        Ok(self.triples.write().insert(triple))
    }

    fn remove(&self, triple: &Triple) -> Result<bool, GraphError> {
        Ok(self.triples.write().remove(triple))
    }

    fn clear(&self) -> Result<(), GraphError> {
        self.triples.write().clear();
        Ok(())
    }
}
