//! graphmux core - RDF graph model and lock-guarded graph handles
//!
//! This crate provides the building blocks the multiplexer hands out:
//! - Graph names, terms, triples and triple patterns
//! - A reentrant read/write lock with per-thread ownership tracking
//! - Triple stores and the `Graph` handle that guards them
//! - Conformance checking of lock discipline (debug builds or the
//!   `lock-checking` feature)

pub mod error;
pub mod graph;
pub mod lock;
pub mod model;
pub mod store;

// Re-exports for convenience
pub use error::{GraphError, LockMode};
pub use graph::{Graph, GraphKind, GraphRef};
pub use lock::{GraphLock, ReadGuard, WriteGuard};
pub use model::{GraphName, Literal, Term, Triple, TriplePattern};
pub use store::{MemoryStore, TripleStore};
