//! Lock-guarded graph handles
//!
//! A [`Graph`] pairs a [`TripleStore`] with a [`GraphLock`] and a fixed
//! [`GraphKind`]. Every read goes through the read side of the lock and
//! every write through the write side, with RAII guards releasing on all
//! exit paths. Writes on an immutable graph fail with
//! [`GraphError::Immutable`].
//!
//! Callers that need several operations to see a consistent state take
//! the lock themselves with [`Graph::read`] or [`Graph::write`]; the lock is
//! reentrant so the individual operations still succeed inside.
//!
//! ## Checked graphs
//!
//! In debug builds, or with the `lock-checking` feature, [`Graph::checked`]
//! builds a graph that refuses every read or write unless the calling
//! thread already holds the matching lock. This catches code that relies
//! on per-call locking where it needed an enclosing critical section.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::{GraphError, LockMode};
use crate::lock::{GraphLock, ReadGuard, WriteGuard};
use crate::model::{Triple, TriplePattern};
use crate::store::{MemoryStore, TripleStore};

/// Shared handle to a graph. Identity is pointer identity.
pub type GraphRef = Arc<Graph>;

/// Mutability class, fixed when the graph is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphKind {
    Mutable,
    Immutable,
}

impl fmt::Display for GraphKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphKind::Mutable => write!(f, "mutable"),
            GraphKind::Immutable => write!(f, "immutable"),
        }
    }
}

/// A named-graph handle: triples plus the lock guarding them.
pub struct Graph {
    store: Arc<dyn TripleStore>,
    kind: GraphKind,
    lock: GraphLock,
    #[cfg(any(debug_assertions, feature = "lock-checking"))]
    checked: bool,
}

impl Graph {
    /// Wrap an existing store.
    pub fn with_store(store: Arc<dyn TripleStore>, kind: GraphKind) -> Self {
        Self {
            store,
            kind,
            lock: GraphLock::new(),
            #[cfg(any(debug_assertions, feature = "lock-checking"))]
            checked: false,
        }
    }

    /// Empty in-memory mutable graph.
    pub fn new_mutable() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), GraphKind::Mutable)
    }

    /// In-memory immutable graph with fixed content.
    pub fn new_immutable(triples: impl IntoIterator<Item = Triple>) -> Self {
        let store: MemoryStore = triples.into_iter().collect();
        Self::with_store(Arc::new(store), GraphKind::Immutable)
    }

    /// Wrap a store in conformance-checking mode.
    #[cfg(any(debug_assertions, feature = "lock-checking"))]
    pub fn checked(store: Arc<dyn TripleStore>, kind: GraphKind) -> Self {
        let mut graph = Self::with_store(store, kind);
        graph.checked = true;
        graph
    }

    /// Whether this graph enforces lock discipline on its callers.
    pub fn is_checked(&self) -> bool {
        #[cfg(any(debug_assertions, feature = "lock-checking"))]
        {
            self.checked
        }
        #[cfg(not(any(debug_assertions, feature = "lock-checking")))]
        {
            false
        }
    }

    pub fn kind(&self) -> GraphKind {
        self.kind
    }

    pub fn is_mutable(&self) -> bool {
        self.kind == GraphKind::Mutable
    }

    /// The lock guarding this graph.
    pub fn lock(&self) -> &GraphLock {
        &self.lock
    }

    /// Take the read side for a multi-operation critical section.
    pub fn read(&self) -> ReadGuard<'_> {
        self.lock.read()
    }

    /// Take the write side for a multi-operation critical section.
    pub fn write(&self) -> WriteGuard<'_> {
        self.lock.write()
    }

    /// True if both handles are the same graph instance.
    pub fn same(a: &GraphRef, b: &GraphRef) -> bool {
        Arc::ptr_eq(a, b)
    }

    // ---- reads ----

    /// All triples, in store order.
    pub fn triples(&self) -> Result<Vec<Triple>, GraphError> {
        self.require(LockMode::Read, "triples")?;
        let _guard = self.lock.read();
        self.store.filter(&TriplePattern::any())
    }

    pub fn filter(&self, pattern: &TriplePattern) -> Result<Vec<Triple>, GraphError> {
        self.require(LockMode::Read, "filter")?;
        let _guard = self.lock.read();
        self.store.filter(pattern)
    }

    pub fn len(&self) -> Result<usize, GraphError> {
        self.require(LockMode::Read, "len")?;
        let _guard = self.lock.read();
        self.store.len()
    }

    pub fn is_empty(&self) -> Result<bool, GraphError> {
        self.require(LockMode::Read, "is_empty")?;
        let _guard = self.lock.read();
        self.store.is_empty()
    }

    pub fn contains(&self, triple: &Triple) -> Result<bool, GraphError> {
        self.require(LockMode::Read, "contains")?;
        let _guard = self.lock.read();
        self.store.contains(triple)
    }

    /// Immutable copy of the current content, taken under the read lock.
    pub fn snapshot(&self) -> Result<Graph, GraphError> {
        let _guard = self.lock.read();
        let triples = self.store.filter(&TriplePattern::any())?;
        let snapshot = Graph::new_immutable(triples);
        #[cfg(any(debug_assertions, feature = "lock-checking"))]
        let snapshot = Graph {
            checked: self.checked,
            ..snapshot
        };
        Ok(snapshot)
    }

    // ---- writes ----

    /// Returns true if the triple was added.
    pub fn insert(&self, triple: Triple) -> Result<bool, GraphError> {
        self.require_mutation("insert")?;
        let _guard = self.lock.write();
        self.store.insert(triple)
    }

    /// Returns true if the triple was present.
    pub fn remove(&self, triple: &Triple) -> Result<bool, GraphError> {
        self.require_mutation("remove")?;
        let _guard = self.lock.write();
        self.store.remove(triple)
    }

    pub fn clear(&self) -> Result<(), GraphError> {
        self.require_mutation("clear")?;
        let _guard = self.lock.write();
        self.store.clear()
    }

    /// Insert every triple under one write hold. Returns how many were new.
    pub fn extend(&self, triples: impl IntoIterator<Item = Triple>) -> Result<usize, GraphError> {
        self.require_mutation("extend")?;
        let _guard = self.lock.write();
        let mut added = 0;
        for triple in triples {
            if self.store.insert(triple)? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Remove every triple matching `pattern`. Returns how many were removed.
    pub fn remove_matching(&self, pattern: &TriplePattern) -> Result<usize, GraphError> {
        self.require_mutation("remove_matching")?;
        let _guard = self.lock.write();
        let matching = self.store.filter(pattern)?;
        let mut removed = 0;
        for triple in &matching {
            if self.store.remove(triple)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn require_mutation(&self, operation: &'static str) -> Result<(), GraphError> {
        self.require(LockMode::Write, operation)?;
        if self.kind == GraphKind::Immutable {
            return Err(GraphError::immutable(operation));
        }
        Ok(())
    }

    #[cfg(any(debug_assertions, feature = "lock-checking"))]
    fn require(&self, mode: LockMode, operation: &'static str) -> Result<(), GraphError> {
        if !self.checked {
            return Ok(());
        }
        let held = match mode {
            LockMode::Read => self.lock.is_read_held_by_current_thread(),
            LockMode::Write => self.lock.is_write_held_by_current_thread(),
        };
        if held {
            Ok(())
        } else {
            tracing::debug!(operation, required = %mode, "lock discipline violation");
            Err(GraphError::lock_violation(operation, mode))
        }
    }

    #[cfg(not(any(debug_assertions, feature = "lock-checking")))]
    #[inline(always)]
    fn require(&self, _mode: LockMode, _operation: &'static str) -> Result<(), GraphError> {
        Ok(())
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("kind", &self.kind)
            .field("checked", &self.is_checked())
            .field("lock", &self.lock)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Term;
    use pretty_assertions::assert_eq;

    fn t(s: &str) -> Triple {
        Triple::iris(s, "urn:p", "urn:o")
    }

    #[test]
    fn test_mutable_graph_round() {
        let graph = Graph::new_mutable();
        assert!(graph.is_mutable());
        assert!(graph.insert(t("urn:a")).unwrap());
        assert_eq!(graph.extend([t("urn:b"), t("urn:a")]).unwrap(), 1);
        assert_eq!(graph.len().unwrap(), 2);
        assert!(graph.contains(&t("urn:b")).unwrap());
        assert!(graph.remove(&t("urn:a")).unwrap());
        assert_eq!(graph.triples().unwrap(), vec![t("urn:b")]);
        graph.clear().unwrap();
        assert!(graph.is_empty().unwrap());
    }

    #[test]
    fn test_immutable_graph_rejects_writes() {
        let graph = Graph::new_immutable([t("urn:a")]);
        assert_eq!(graph.kind(), GraphKind::Immutable);
        assert_eq!(graph.insert(t("urn:b")), Err(GraphError::immutable("insert")));
        assert!(matches!(
            graph.clear(),
            Err(GraphError::Immutable { operation: "clear" })
        ));
        assert_eq!(graph.len().unwrap(), 1);
    }

    #[test]
    fn test_remove_matching() {
        let graph = Graph::new_mutable();
        graph
            .extend([
                Triple::iris("urn:a", "urn:p", "urn:x"),
                Triple::iris("urn:a", "urn:q", "urn:y"),
                Triple::iris("urn:b", "urn:p", "urn:z"),
            ])
            .unwrap();
        let removed = graph
            .remove_matching(&TriplePattern::any().with_subject(Term::iri("urn:a")))
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(graph.triples().unwrap(), vec![Triple::iris("urn:b", "urn:p", "urn:z")]);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let graph = Graph::new_mutable();
        graph.insert(t("urn:a")).unwrap();
        let snapshot = graph.snapshot().unwrap();
        graph.insert(t("urn:b")).unwrap();
        assert_eq!(snapshot.kind(), GraphKind::Immutable);
        assert_eq!(snapshot.triples().unwrap(), vec![t("urn:a")]);
    }

    #[test]
    fn test_operations_inside_critical_section() {
        let graph = Graph::new_mutable();
        let _w = graph.write();
        graph.insert(t("urn:a")).unwrap();
        assert_eq!(graph.len().unwrap(), 1);
    }

    #[test]
    fn test_guards_released_after_error() {
        let graph = Graph::new_immutable([]);
        assert!(graph.insert(t("urn:a")).is_err());
        assert!(!graph.lock().is_write_locked());
        assert_eq!(graph.lock().reader_count(), 0);
    }

    #[cfg(any(debug_assertions, feature = "lock-checking"))]
    #[test]
    fn test_checked_graph_requires_held_lock() {
        let graph = Graph::checked(Arc::new(MemoryStore::new()), GraphKind::Mutable);
        assert!(graph.is_checked());

        let err = graph.insert(t("urn:a")).unwrap_err();
        assert_eq!(err, GraphError::lock_violation("insert", LockMode::Write));
        let err = graph.len().unwrap_err();
        assert_eq!(err, GraphError::lock_violation("len", LockMode::Read));

        {
            let _w = graph.write();
            assert!(graph.insert(t("urn:a")).unwrap());
            assert_eq!(graph.len().unwrap(), 1);
        }
        {
            let _r = graph.read();
            assert_eq!(graph.triples().unwrap(), vec![t("urn:a")]);
            assert!(graph.insert(t("urn:b")).unwrap_err().is_lock_violation());
        }
    }

    #[cfg(any(debug_assertions, feature = "lock-checking"))]
    #[test]
    fn test_checked_snapshot_stays_checked() {
        let graph = Graph::checked(Arc::new(MemoryStore::new()), GraphKind::Mutable);
        let snapshot = graph.snapshot().unwrap();
        assert!(snapshot.is_checked());
        assert!(snapshot.len().unwrap_err().is_lock_violation());
    }
}
