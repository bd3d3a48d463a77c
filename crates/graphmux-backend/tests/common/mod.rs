//! Shared fixtures for multiplexer integration tests.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use graphmux_backend::{GraphListener, MemoryProvider, Provider, ProviderError};
use graphmux_core::{Graph, GraphKind, GraphName, GraphRef, Triple};
use parking_lot::Mutex;

pub fn name(s: &str) -> GraphName {
    GraphName::new(s).unwrap()
}

pub fn triple(tag: &str) -> Triple {
    Triple::iris(&format!("urn:s:{}", tag), "urn:p", "urn:o")
}

/// Memory provider holding one mutable graph tagged with a marker triple.
pub fn provider_with_mutable(
    provider: &str,
    weight: i32,
    graph: &str,
) -> (Arc<MemoryProvider>, GraphRef) {
    let mem = Arc::new(MemoryProvider::new(provider, weight));
    let handle = mem.seed_mutable(name(graph), [triple(provider)]).unwrap();
    (mem, handle)
}

pub fn as_provider(mem: &Arc<MemoryProvider>) -> Arc<dyn Provider> {
    Arc::clone(mem) as Arc<dyn Provider>
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Appeared(String, GraphKind),
    Disappeared(String),
}

/// Listener recording every notification in order.
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<Notification>>,
}

impl RecordingListener {
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl GraphListener for RecordingListener {
    fn graph_appeared(&self, name: &GraphName, kind: GraphKind) {
        self.events
            .lock()
            .push(Notification::Appeared(name.to_string(), kind));
    }

    fn graph_disappeared(&self, name: &GraphName) {
        self.events
            .lock()
            .push(Notification::Disappeared(name.to_string()));
    }
}

pub fn appeared(name: &str, kind: GraphKind) -> Notification {
    Notification::Appeared(name.to_string(), kind)
}

pub fn disappeared(name: &str) -> Notification {
    Notification::Disappeared(name.to_string())
}

/// Provider that builds a new handle on every request, after a delay.
///
/// Stands in for backends that do not keep handles around, so the
/// multiplexer's cache is the only thing preventing duplicate instances.
pub struct FreshProvider {
    name: String,
    weight: i32,
    graphs: BTreeSet<GraphName>,
    delay: Duration,
    listed: bool,
    kind: GraphKind,
    pub fetches: AtomicUsize,
}

impl FreshProvider {
    pub fn new(name: &str, weight: i32, graphs: &[&str], delay: Duration) -> Self {
        Self {
            name: name.to_string(),
            weight,
            graphs: graphs.iter().map(|g| self::name(g)).collect(),
            delay,
            listed: true,
            kind: GraphKind::Mutable,
            fetches: AtomicUsize::new(0),
        }
    }

    /// Serve immutable graphs holding one triple tagged with the provider
    /// name.
    pub fn immutable(mut self) -> Self {
        self.kind = GraphKind::Immutable;
        self
    }

    fn listed_as(&self, kind: GraphKind) -> BTreeSet<GraphName> {
        if self.listed && self.kind == kind {
            self.graphs.clone()
        } else {
            BTreeSet::new()
        }
    }

    fn fetch(&self, name: &GraphName, kind: GraphKind) -> Result<GraphRef, ProviderError> {
        if !self.graphs.contains(name) {
            return Err(ProviderError::not_found(name));
        }
        if kind != self.kind {
            return Err(ProviderError::wrong_kind(name, self.kind));
        }
        self.fetches.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        Ok(Arc::new(match kind {
            GraphKind::Mutable => Graph::new_mutable(),
            GraphKind::Immutable => Graph::new_immutable([triple(&self.name)]),
        }))
    }

    /// Serve the graphs without advertising them, so registration leaves
    /// the cache cold.
    pub fn unlisted(mut self) -> Self {
        self.listed = false;
        self
    }
}

impl Provider for FreshProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn weight(&self) -> i32 {
        self.weight
    }

    fn list_mutable_graphs(&self) -> Result<BTreeSet<GraphName>, ProviderError> {
        Ok(self.listed_as(GraphKind::Mutable))
    }

    fn list_immutable_graphs(&self) -> Result<BTreeSet<GraphName>, ProviderError> {
        Ok(self.listed_as(GraphKind::Immutable))
    }

    fn get_mutable(&self, name: &GraphName) -> Result<GraphRef, ProviderError> {
        self.fetch(name, GraphKind::Mutable)
    }

    fn get_immutable(&self, name: &GraphName) -> Result<GraphRef, ProviderError> {
        self.fetch(name, GraphKind::Immutable)
    }

    fn create_mutable(&self, _name: &GraphName) -> Result<GraphRef, ProviderError> {
        Err(ProviderError::unsupported("create"))
    }

    fn create_immutable(
        &self,
        _name: &GraphName,
        _triples: Vec<Triple>,
    ) -> Result<GraphRef, ProviderError> {
        Err(ProviderError::unsupported("create"))
    }

    fn delete(&self, name: &GraphName) -> Result<(), ProviderError> {
        Err(ProviderError::undeletable(name))
    }
}

/// Provider whose every call fails with a backend fault.
pub struct FaultyProvider {
    pub weight: i32,
}

impl Provider for FaultyProvider {
    fn name(&self) -> &str {
        "faulty"
    }

    fn weight(&self) -> i32 {
        self.weight
    }

    fn list_mutable_graphs(&self) -> Result<BTreeSet<GraphName>, ProviderError> {
        Err(ProviderError::backend("listing unavailable"))
    }

    fn list_immutable_graphs(&self) -> Result<BTreeSet<GraphName>, ProviderError> {
        Err(ProviderError::backend("listing unavailable"))
    }

    fn get_mutable(&self, _name: &GraphName) -> Result<GraphRef, ProviderError> {
        Err(ProviderError::backend("connection refused"))
    }

    fn get_immutable(&self, _name: &GraphName) -> Result<GraphRef, ProviderError> {
        Err(ProviderError::backend("connection refused"))
    }

    fn create_mutable(&self, _name: &GraphName) -> Result<GraphRef, ProviderError> {
        Err(ProviderError::backend("connection refused"))
    }

    fn create_immutable(
        &self,
        _name: &GraphName,
        _triples: Vec<Triple>,
    ) -> Result<GraphRef, ProviderError> {
        Err(ProviderError::backend("connection refused"))
    }

    fn delete(&self, _name: &GraphName) -> Result<(), ProviderError> {
        Err(ProviderError::backend("connection refused"))
    }
}

/// Provider that advertises nothing but reports a conflict on every
/// creation, like a backend whose namespace is taken by hidden graphs.
pub struct ConflictingProvider {
    pub weight: i32,
}

impl Provider for ConflictingProvider {
    fn name(&self) -> &str {
        "conflicting"
    }

    fn weight(&self) -> i32 {
        self.weight
    }

    fn list_mutable_graphs(&self) -> Result<BTreeSet<GraphName>, ProviderError> {
        Ok(BTreeSet::new())
    }

    fn list_immutable_graphs(&self) -> Result<BTreeSet<GraphName>, ProviderError> {
        Ok(BTreeSet::new())
    }

    fn get_mutable(&self, name: &GraphName) -> Result<GraphRef, ProviderError> {
        Err(ProviderError::not_found(name))
    }

    fn get_immutable(&self, name: &GraphName) -> Result<GraphRef, ProviderError> {
        Err(ProviderError::not_found(name))
    }

    fn create_mutable(&self, name: &GraphName) -> Result<GraphRef, ProviderError> {
        Err(ProviderError::conflict(name))
    }

    fn create_immutable(
        &self,
        name: &GraphName,
        _triples: Vec<Triple>,
    ) -> Result<GraphRef, ProviderError> {
        Err(ProviderError::conflict(name))
    }

    fn delete(&self, name: &GraphName) -> Result<(), ProviderError> {
        Err(ProviderError::not_found(name))
    }
}
