//! In-memory provider.
//!
//! Serves graphs from a map guarded by a `parking_lot::RwLock`. Used by
//! the CLI for providers declared in configuration, and by tests.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use graphmux_core::{Graph, GraphKind, GraphName, GraphRef, MemoryStore, Triple};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::ProviderError;
use crate::traits::Provider;

/// Provider keeping every graph in memory.
pub struct MemoryProvider {
    name: String,
    weight: i32,
    read_only: bool,
    #[cfg(any(debug_assertions, feature = "lock-checking"))]
    checked: bool,
    graphs: RwLock<HashMap<GraphName, GraphRef>>,
}

impl MemoryProvider {
    pub fn new(name: impl Into<String>, weight: i32) -> Self {
        Self {
            name: name.into(),
            weight,
            read_only: false,
            #[cfg(any(debug_assertions, feature = "lock-checking"))]
            checked: false,
            graphs: RwLock::new(HashMap::new()),
        }
    }

    /// Refuse creation and deletion. Seeded graphs are still served.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Hand out graphs in conformance-checking mode.
    #[cfg(any(debug_assertions, feature = "lock-checking"))]
    pub fn with_lock_checking(mut self) -> Self {
        self.checked = true;
        self
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Add or replace a graph directly, bypassing the read-only flag.
    pub fn seed(&self, name: GraphName, graph: GraphRef) {
        debug!("Provider '{}' seeded with '{}'", self.name, name);
        self.graphs.write().insert(name, graph);
    }

    /// Seed a new mutable graph holding `triples`.
    pub fn seed_mutable(
        &self,
        name: GraphName,
        triples: impl IntoIterator<Item = Triple>,
    ) -> Result<GraphRef, ProviderError> {
        let graph = self.new_graph(GraphKind::Mutable, Vec::new());
        {
            let _hold = graph.write();
            graph.extend(triples)?;
        }
        self.seed(name, Arc::clone(&graph));
        Ok(graph)
    }

    /// Seed a new immutable graph holding `triples`.
    pub fn seed_immutable(
        &self,
        name: GraphName,
        triples: impl IntoIterator<Item = Triple>,
    ) -> GraphRef {
        let graph = self.new_graph(GraphKind::Immutable, triples.into_iter().collect());
        self.seed(name, Arc::clone(&graph));
        graph
    }

    /// Number of graphs held.
    pub fn graph_count(&self) -> usize {
        self.graphs.read().len()
    }

    fn new_graph(&self, kind: GraphKind, triples: Vec<Triple>) -> GraphRef {
        let store: Arc<MemoryStore> = Arc::new(triples.into_iter().collect());
        #[cfg(any(debug_assertions, feature = "lock-checking"))]
        {
            if self.checked {
                return Arc::new(Graph::checked(store, kind));
            }
        }
        Arc::new(Graph::with_store(store, kind))
    }

    fn names_of_kind(&self, kind: GraphKind) -> BTreeSet<GraphName> {
        self.graphs
            .read()
            .iter()
            .filter(|(_, graph)| graph.kind() == kind)
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn get_of_kind(&self, name: &GraphName, kind: GraphKind) -> Result<GraphRef, ProviderError> {
        match self.graphs.read().get(name) {
            Some(graph) if graph.kind() == kind => Ok(Arc::clone(graph)),
            Some(graph) => Err(ProviderError::wrong_kind(name, graph.kind())),
            None => Err(ProviderError::not_found(name)),
        }
    }

    fn create(
        &self,
        name: &GraphName,
        kind: GraphKind,
        triples: Vec<Triple>,
    ) -> Result<GraphRef, ProviderError> {
        if self.read_only {
            return Err(ProviderError::unsupported("create"));
        }
        let mut graphs = self.graphs.write();
        if graphs.contains_key(name) {
            return Err(ProviderError::conflict(name));
        }
        let graph = self.new_graph(kind, triples);
        graphs.insert(name.clone(), Arc::clone(&graph));
        debug!("Provider '{}' created {} graph '{}'", self.name, kind, name);
        Ok(graph)
    }
}

impl Provider for MemoryProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn weight(&self) -> i32 {
        self.weight
    }

    fn list_mutable_graphs(&self) -> Result<BTreeSet<GraphName>, ProviderError> {
        Ok(self.names_of_kind(GraphKind::Mutable))
    }

    fn list_immutable_graphs(&self) -> Result<BTreeSet<GraphName>, ProviderError> {
        Ok(self.names_of_kind(GraphKind::Immutable))
    }

    fn list_graphs(&self) -> Result<BTreeSet<GraphName>, ProviderError> {
        Ok(self.graphs.read().keys().cloned().collect())
    }

    fn get_mutable(&self, name: &GraphName) -> Result<GraphRef, ProviderError> {
        self.get_of_kind(name, GraphKind::Mutable)
    }

    fn get_immutable(&self, name: &GraphName) -> Result<GraphRef, ProviderError> {
        self.get_of_kind(name, GraphKind::Immutable)
    }

    fn get_graph(&self, name: &GraphName) -> Result<GraphRef, ProviderError> {
        self.graphs
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ProviderError::not_found(name))
    }

    fn create_mutable(&self, name: &GraphName) -> Result<GraphRef, ProviderError> {
        self.create(name, GraphKind::Mutable, Vec::new())
    }

    fn create_immutable(
        &self,
        name: &GraphName,
        triples: Vec<Triple>,
    ) -> Result<GraphRef, ProviderError> {
        self.create(name, GraphKind::Immutable, triples)
    }

    fn delete(&self, name: &GraphName) -> Result<(), ProviderError> {
        if self.read_only {
            return Err(ProviderError::undeletable(name));
        }
        match self.graphs.write().remove(name) {
            Some(_) => {
                debug!("Provider '{}' deleted '{}'", self.name, name);
                Ok(())
            }
            None => Err(ProviderError::not_found(name)),
        }
    }

    fn names_of(&self, graph: &Graph) -> BTreeSet<GraphName> {
        self.graphs
            .read()
            .iter()
            .filter(|(_, held)| std::ptr::eq(Arc::as_ptr(held), graph))
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl fmt::Debug for MemoryProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryProvider")
            .field("name", &self.name)
            .field("weight", &self.weight)
            .field("read_only", &self.read_only)
            .field("graphs", &self.graph_count())
            .finish()
    }
}
