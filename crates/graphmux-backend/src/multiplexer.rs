//! Multiplexer: one graph namespace over many weighted providers.
//!
//! Each name is served by the highest-weight registered provider that has
//! it. Class-restricted requests (`get_mutable_graph`,
//! `get_immutable_graph`) check the [`GraphCache`] slot for that class
//! first, then walk the [`ProviderRegistry`] from the highest weight down
//! and publish the first answer of that class. Requests about the name as a
//! whole (`get_graph`, `owner_of`, creation, deletion) always walk the
//! registry, so a cached handle of one class never decides who owns a name.
//! Registering or deregistering a provider re-resolves the names it serves,
//! and listeners hear about every change of owner.
//!
//! No multiplexer lock is held while a provider or listener runs.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use graphmux_config::{MuxConfig, ProviderConfig};
use graphmux_core::{Graph, GraphKind, GraphName, GraphRef, Triple};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::cache::{CacheMetrics, GraphCache, DEFAULT_RETAIN_CAPACITY};
use crate::error::{MultiplexerError, ProviderError};
use crate::memory::MemoryProvider;
use crate::registry::{ProviderInfo, ProviderRegistry, RegisteredProvider};
use crate::traits::{GraphListener, Provider};
use crate::Result;

/// Owner change to report once locks are released.
enum Event {
    Appeared(GraphName, GraphKind),
    Disappeared(GraphName),
}

/// Routes graph requests to the highest-weight provider serving each name.
pub struct Multiplexer {
    registry: ProviderRegistry,
    cache: GraphCache,
    listeners: RwLock<Vec<Arc<dyn GraphListener>>>,
}

impl Default for Multiplexer {
    fn default() -> Self {
        Self::new()
    }
}

impl Multiplexer {
    /// Create an empty multiplexer with the default cache retention.
    pub fn new() -> Self {
        Self::with_cache_capacity(DEFAULT_RETAIN_CAPACITY)
    }

    /// Create an empty multiplexer keeping up to `retain_capacity` recently
    /// used handles alive.
    pub fn with_cache_capacity(retain_capacity: usize) -> Self {
        Self {
            registry: ProviderRegistry::new(),
            cache: GraphCache::new(retain_capacity),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Build a multiplexer and register the in-memory providers declared in
    /// `config`.
    pub fn from_config(config: &MuxConfig) -> Result<Self> {
        config.validate()?;
        let mux = Self::with_cache_capacity(config.cache.retain_capacity);
        for provider_config in &config.providers {
            let provider = memory_provider_from_config(provider_config, config.locking.checked)?;
            mux.register_provider(Arc::new(provider));
        }
        info!(
            "Multiplexer ready with {} providers",
            mux.registry.len()
        );
        Ok(mux)
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// The mutable graph served under `name`.
    pub fn get_mutable_graph(&self, name: &GraphName) -> Result<GraphRef> {
        if let Some(hit) = self.cache.lookup(name, GraphKind::Mutable) {
            debug!("Cache hit for mutable '{}' ({})", name, hit.owner.name());
            return Ok(hit.graph);
        }
        self.walk(name, Some(GraphKind::Mutable), |p| p.get_mutable(name))?
            .map(|(_, graph)| graph)
            .ok_or_else(|| MultiplexerError::no_such_entity(name))
    }

    /// An immutable view of the graph served under `name`.
    ///
    /// Prefers a real immutable graph; otherwise snapshots the mutable
    /// graph under its read lock.
    pub fn get_immutable_graph(&self, name: &GraphName) -> Result<GraphRef> {
        if let Some(hit) = self.cache.lookup(name, GraphKind::Immutable) {
            debug!("Cache hit for immutable '{}' ({})", name, hit.owner.name());
            return Ok(hit.graph);
        }
        if let Some((_, graph)) =
            self.walk(name, Some(GraphKind::Immutable), |p| p.get_immutable(name))?
        {
            return Ok(graph);
        }
        let mutable = self.get_mutable_graph(name)?;
        Ok(Arc::new(mutable.snapshot()?))
    }

    /// The graph served under `name` by its owner, whichever class it is.
    pub fn get_graph(&self, name: &GraphName) -> Result<GraphRef> {
        self.walk(name, None, |p| p.get_graph(name))?
            .map(|(_, graph)| graph)
            .ok_or_else(|| MultiplexerError::no_such_entity(name))
    }

    /// The provider currently serving `name`, if any.
    pub fn owner_of(&self, name: &GraphName) -> Result<Option<ProviderInfo>> {
        Ok(self.resolve_owner(name)?.map(|owner| owner.info()))
    }

    /// The highest-ranked registered provider serving `name` in any class.
    fn resolve_owner(&self, name: &GraphName) -> Result<Option<RegisteredProvider>> {
        Ok(self
            .walk(name, None, |p| p.get_graph(name))?
            .map(|(owner, _)| owner))
    }

    /// Ask providers from highest to lowest weight; publish the first
    /// answer of the wanted kind.
    fn walk(
        &self,
        name: &GraphName,
        want: Option<GraphKind>,
        fetch: impl Fn(&dyn Provider) -> std::result::Result<GraphRef, ProviderError>,
    ) -> Result<Option<(RegisteredProvider, GraphRef)>> {
        for entry in self.registry.providers_descending() {
            match fetch(&**entry.provider()) {
                Ok(graph) => {
                    if want.is_some_and(|kind| graph.kind() != kind) {
                        debug!(
                            "Provider '{}' returned a {} graph for '{}', skipping",
                            entry.name(),
                            graph.kind(),
                            name
                        );
                        continue;
                    }
                    if let Some(graph) = self.publish(name, &entry, graph) {
                        debug!("Resolved '{}' to provider '{}'", name, entry.name());
                        return Ok(Some((entry, graph)));
                    }
                }
                Err(e) if e.is_fallthrough() => {
                    debug!("Provider '{}' passed on '{}': {}", entry.name(), name, e);
                }
                Err(e) => return Err(MultiplexerError::provider(entry.name(), e)),
            }
        }
        debug!("No provider serves '{}'", name);
        Ok(None)
    }

    fn publish(
        &self,
        name: &GraphName,
        owner: &RegisteredProvider,
        graph: GraphRef,
    ) -> Option<GraphRef> {
        self.cache
            .publish(name, owner, graph, |owner| self.registry.is_registered(owner))
    }

    // ========================================================================
    // Creation and deletion
    // ========================================================================

    /// Create an empty mutable graph in the highest-weight provider that
    /// accepts it.
    pub fn create_mutable_graph(&self, name: &GraphName) -> Result<GraphRef> {
        self.create(name, GraphKind::Mutable, |p| p.create_mutable(name))
    }

    /// Create an immutable graph holding `triples` in the highest-weight
    /// provider that accepts it.
    pub fn create_immutable_graph(
        &self,
        name: &GraphName,
        triples: Vec<Triple>,
    ) -> Result<GraphRef> {
        self.create(name, GraphKind::Immutable, |p| {
            p.create_immutable(name, triples.clone())
        })
    }

    /// Offer the creation to providers outranking the current owner.
    ///
    /// A provider reporting a conflict passes the request down like any
    /// other refusal. `AlreadyExists` is raised when the walk reaches the
    /// current owner, or ends after at least one conflict.
    fn create(
        &self,
        name: &GraphName,
        kind: GraphKind,
        create: impl Fn(&dyn Provider) -> std::result::Result<GraphRef, ProviderError>,
    ) -> Result<GraphRef> {
        let existing = self.resolve_owner(name)?;
        let mut conflicted = false;

        for entry in self.registry.providers_descending() {
            if let Some(owner) = &existing {
                if owner.ranks_at_least(&entry) {
                    return Err(MultiplexerError::already_exists(name));
                }
            }
            match create(&**entry.provider()) {
                Ok(graph) => {
                    self.cache.insert(name.clone(), entry.clone(), &graph);
                    info!(
                        "Created {} graph '{}' in provider '{}'",
                        kind,
                        name,
                        entry.name()
                    );

                    let mut events = Vec::with_capacity(2);
                    if existing.is_some() {
                        events.push(Event::Disappeared(name.clone()));
                    }
                    events.push(Event::Appeared(name.clone(), graph.kind()));
                    self.notify(events);
                    return Ok(graph);
                }
                Err(e @ ProviderError::Conflict { .. }) => {
                    debug!("Provider '{}' could not create '{}': {}", entry.name(), name, e);
                    conflicted = true;
                }
                Err(e) if e.is_fallthrough() => {
                    debug!("Provider '{}' declined to create '{}': {}", entry.name(), name, e);
                }
                Err(e) => return Err(MultiplexerError::provider(entry.name(), e)),
            }
        }

        if conflicted {
            return Err(MultiplexerError::already_exists(name));
        }
        Err(MultiplexerError::unsupported(match kind {
            GraphKind::Mutable => "create mutable graph",
            GraphKind::Immutable => "create immutable graph",
        }))
    }

    /// Delete the graph from the provider serving it.
    ///
    /// If a lower-weight provider also serves the name, it takes over and
    /// an appearance is reported for it.
    pub fn delete_graph(&self, name: &GraphName) -> Result<()> {
        let Some(owner) = self.resolve_owner(name)? else {
            return Err(MultiplexerError::no_such_entity(name));
        };

        match owner.provider().delete(name) {
            Ok(()) => {
                self.cache.remove_owned_by(name, &owner);
                info!("Deleted graph '{}' from provider '{}'", name, owner.name());
                let mut events = vec![Event::Disappeared(name.clone())];
                if let Some(kind) = self.reresolve(name) {
                    events.push(Event::Appeared(name.clone(), kind));
                }
                self.notify(events);
                Ok(())
            }
            Err(ProviderError::NotFound { .. }) => {
                // Removed by someone else since the walk
                self.cache.remove_owned_by(name, &owner);
                Err(MultiplexerError::no_such_entity(name))
            }
            Err(e) if e.is_fallthrough() => {
                debug!("Provider '{}' refused to delete '{}': {}", owner.name(), name, e);
                Err(MultiplexerError::undeletable(name))
            }
            Err(e) => Err(MultiplexerError::provider(owner.name(), e)),
        }
    }

    /// Cache whichever registered provider now serves `name`.
    ///
    /// Provider faults are logged and skipped.
    fn reresolve(&self, name: &GraphName) -> Option<GraphKind> {
        for entry in self.registry.providers_descending() {
            match entry.provider().get_graph(name) {
                Ok(graph) => {
                    if let Some(graph) = self.publish(name, &entry, graph) {
                        debug!("'{}' now served by provider '{}'", name, entry.name());
                        return Some(graph.kind());
                    }
                }
                Err(e) if e.is_fallthrough() => {}
                Err(e) => warn!(
                    "Re-resolving '{}' in provider '{}' failed: {}",
                    name,
                    entry.name(),
                    e
                ),
            }
        }
        None
    }

    // ========================================================================
    // Provider registration
    // ========================================================================

    /// Register a provider and let it take over the names it outranks.
    ///
    /// Returns `false` if this provider instance is already registered.
    pub fn register_provider(&self, provider: Arc<dyn Provider>) -> bool {
        let Some(entry) = self.registry.register(provider) else {
            debug!("Provider already registered, ignoring");
            return false;
        };
        info!(
            "Registered provider '{}' with weight {}",
            entry.name(),
            entry.weight()
        );

        let names = match entry.provider().list_graphs() {
            Ok(names) => names,
            Err(e) => {
                warn!("Listing graphs of provider '{}' failed: {}", entry.name(), e);
                return true;
            }
        };

        let mut events = Vec::new();
        for name in names {
            // Handles from lighter providers must not outlive the new order
            self.cache.remove_outranked_by(&name, &entry);
            if self.served_by(&name, |p| p.outranks(&entry)) {
                continue;
            }

            let graph = match entry.provider().get_graph(&name) {
                Ok(graph) => graph,
                Err(e) => {
                    warn!(
                        "Provider '{}' listed '{}' but could not serve it: {}",
                        entry.name(),
                        name,
                        e
                    );
                    continue;
                }
            };

            let Some(graph) = self.publish(&name, &entry, graph) else {
                continue;
            };
            if self.served_by(&name, |p| entry.outranks(p)) {
                debug!("'{}' moves to provider '{}'", name, entry.name());
                events.push(Event::Disappeared(name.clone()));
            }
            events.push(Event::Appeared(name, graph.kind()));
        }

        self.notify(events);
        true
    }

    /// True if a registered provider selected by `rank` serves `name`.
    ///
    /// Provider faults are logged and count as not serving.
    fn served_by(&self, name: &GraphName, rank: impl Fn(&RegisteredProvider) -> bool) -> bool {
        self.registry
            .providers_descending()
            .filter(|p| rank(p))
            .any(|p| match p.provider().get_graph(name) {
                Ok(_) => true,
                Err(e) if e.is_fallthrough() => false,
                Err(e) => {
                    warn!("Provider '{}' failed on '{}': {}", p.name(), name, e);
                    false
                }
            })
    }

    /// Deregister a provider; its names fall back to the next provider
    /// serving them, or become unresolved.
    ///
    /// Returns `false` if the provider was not registered.
    pub fn deregister_provider(&self, provider: &Arc<dyn Provider>) -> bool {
        let Some(removed) = self.registry.deregister(provider) else {
            debug!("Provider not registered, ignoring");
            return false;
        };
        let gone = &removed.entry;
        info!("Deregistered provider '{}'", gone.name());

        let mut names = removed.names;
        names.extend(self.cache.names_owned_by(gone));

        let mut events = Vec::new();
        for name in names {
            self.cache.remove_owned_by(&name, gone);
            if self.served_by(&name, |p| p.outranks(gone)) {
                continue;
            }
            events.push(Event::Disappeared(name.clone()));
            match self.reresolve(&name) {
                Some(kind) => events.push(Event::Appeared(name, kind)),
                None => debug!("'{}' is no longer served", name),
            }
        }

        self.notify(events);
        true
    }

    // ========================================================================
    // Listing and monitoring
    // ========================================================================

    /// Every name served by any registered provider.
    pub fn list_all_graph_names(&self) -> Result<BTreeSet<GraphName>> {
        self.collect_names(|p| p.list_graphs())
    }

    /// Every name served as a mutable graph by any registered provider.
    pub fn list_mutable_graph_names(&self) -> Result<BTreeSet<GraphName>> {
        self.collect_names(|p| p.list_mutable_graphs())
    }

    /// Every name served as an immutable graph by any registered provider.
    pub fn list_immutable_graph_names(&self) -> Result<BTreeSet<GraphName>> {
        self.collect_names(|p| p.list_immutable_graphs())
    }

    fn collect_names(
        &self,
        list: impl Fn(&dyn Provider) -> std::result::Result<BTreeSet<GraphName>, ProviderError>,
    ) -> Result<BTreeSet<GraphName>> {
        let mut names = BTreeSet::new();
        for entry in self.registry.providers_descending() {
            let listed = list(&**entry.provider())
                .map_err(|e| MultiplexerError::provider(entry.name(), e))?;
            names.extend(listed);
        }
        Ok(names)
    }

    /// Every name under which any provider knows this graph instance.
    pub fn names_of(&self, graph: &Graph) -> BTreeSet<GraphName> {
        self.registry
            .providers_descending()
            .flat_map(|entry| entry.provider().names_of(graph))
            .collect()
    }

    /// Registered providers in priority order.
    pub fn providers(&self) -> Vec<ProviderInfo> {
        self.registry.snapshot()
    }

    pub fn cache_metrics(&self) -> CacheMetrics {
        self.cache.metrics()
    }

    /// Drop cache entries whose handles were reclaimed. Returns how many.
    pub fn purge_stale(&self) -> usize {
        self.cache.purge_stale()
    }

    /// Subscribe to appearance and disappearance notifications.
    pub fn add_listener(&self, listener: Arc<dyn GraphListener>) {
        self.listeners.write().push(listener);
    }

    fn notify(&self, events: Vec<Event>) {
        if events.is_empty() {
            return;
        }
        let listeners = self.listeners.read().clone();
        for event in &events {
            for listener in &listeners {
                match event {
                    Event::Appeared(name, kind) => listener.graph_appeared(name, *kind),
                    Event::Disappeared(name) => listener.graph_disappeared(name),
                }
            }
        }
    }
}

impl fmt::Debug for Multiplexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Multiplexer")
            .field("providers", &self.registry.len())
            .field("cached", &self.cache.len())
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}

/// Build an in-memory provider from its configuration section.
pub fn memory_provider_from_config(
    config: &ProviderConfig,
    checked: bool,
) -> Result<MemoryProvider> {
    let mut provider = MemoryProvider::new(&config.name, config.weight);
    if config.read_only {
        provider = provider.read_only();
    }
    if checked {
        #[cfg(any(debug_assertions, feature = "lock-checking"))]
        {
            provider = provider.with_lock_checking();
        }
        #[cfg(not(any(debug_assertions, feature = "lock-checking")))]
        warn!(
            "Lock checking requested for provider '{}' but not compiled in",
            config.name
        );
    }

    for seed in &config.graphs {
        let triples = seed.triples()?;
        match seed.kind {
            GraphKind::Mutable => {
                provider
                    .seed_mutable(seed.name.clone(), triples)
                    .map_err(|e| MultiplexerError::provider(&config.name, e))?;
            }
            GraphKind::Immutable => {
                provider.seed_immutable(seed.name.clone(), triples);
            }
        }
    }
    debug!(
        "Built provider '{}' with {} graphs",
        config.name,
        provider.graph_count()
    );
    Ok(provider)
}
