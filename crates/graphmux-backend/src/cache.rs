//! Graph cache
//!
//! Keeps one slot per name and mutability class. A slot holds the provider
//! that served the handle and a weak reference to the handle itself. A
//! caller holding a handle keeps it alive, so the multiplexer keeps
//! returning that same instance; once every strong reference is gone the
//! slot goes stale and the next access resolves afresh.
//!
//! Slots only remember handles. Which provider owns a name across both
//! classes is decided by the registry, never by the cache.
//!
//! A bounded LRU of strong references keeps the most recently used handles
//! alive even when no caller holds them, so hot graphs are not rebuilt on
//! every request.
//!
//! Thread-safe via interior mutability using parking_lot::Mutex. The lock
//! is never held across a provider call.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Weak};

use graphmux_core::{Graph, GraphKind, GraphName, GraphRef};
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::registry::RegisteredProvider;

pub use graphmux_config::DEFAULT_RETAIN_CAPACITY;

/// Cache metrics for monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheMetrics {
    /// Lookups answered with a live handle
    pub hits: u64,
    /// Lookups with no slot
    pub misses: u64,
    /// Lookups that found a slot whose handle had been reclaimed
    pub stale: u64,
    /// Slots written (publish or insert)
    pub insertions: u64,
    /// Handles pushed out of the LRU retention set
    pub evictions: u64,
    /// Slots removed explicitly
    pub removals: u64,
}

impl CacheMetrics {
    /// Get hit rate as a percentage (0.0 - 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.stale;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// A live cache hit.
#[derive(Debug, Clone)]
pub struct CachedGraph {
    pub owner: RegisteredProvider,
    pub graph: GraphRef,
}

type SlotKey = (GraphName, GraphKind);

struct Slot {
    owner: RegisteredProvider,
    handle: Weak<Graph>,
}

/// Inner state (protected by Mutex)
struct CacheState {
    slots: HashMap<SlotKey, Slot>,

    /// Strong references to recently used handles
    retained: LruCache<SlotKey, GraphRef>,

    metrics: CacheMetrics,
}

impl CacheState {
    fn store(&mut self, key: SlotKey, owner: RegisteredProvider, graph: &GraphRef) {
        self.slots.insert(
            key.clone(),
            Slot {
                owner,
                handle: Arc::downgrade(graph),
            },
        );
        self.retain(key, graph);
        self.metrics.insertions += 1;
    }

    fn retain(&mut self, key: SlotKey, graph: &GraphRef) {
        if let Some((evicted, _)) = self.retained.push(key.clone(), Arc::clone(graph)) {
            if evicted != key {
                self.metrics.evictions += 1;
            }
        }
    }

    /// Drop the slots of `name` matching `pred`. Returns how many.
    fn forget_where(&mut self, name: &GraphName, pred: impl Fn(&Slot) -> bool) -> usize {
        let mut removed = 0;
        for kind in [GraphKind::Mutable, GraphKind::Immutable] {
            let key = (name.clone(), kind);
            if self.slots.get(&key).is_some_and(&pred) {
                self.slots.remove(&key);
                self.retained.pop(&key);
                self.metrics.removals += 1;
                removed += 1;
            }
        }
        removed
    }
}

/// (name, class) → (provider, weak handle) cache with LRU retention.
pub struct GraphCache {
    state: Mutex<CacheState>,
}

impl Default for GraphCache {
    fn default() -> Self {
        Self::new(DEFAULT_RETAIN_CAPACITY)
    }
}

impl GraphCache {
    /// Create a cache keeping up to `retain_capacity` handles alive.
    pub fn new(retain_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(retain_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            state: Mutex::new(CacheState {
                slots: HashMap::new(),
                retained: LruCache::new(capacity),
                metrics: CacheMetrics::default(),
            }),
        }
    }

    /// The live `kind` handle for `name`, if any.
    ///
    /// Returns `None` when there is no slot or the handle was reclaimed.
    pub fn lookup(&self, name: &GraphName, kind: GraphKind) -> Option<CachedGraph> {
        let mut state = self.state.lock();
        let key = (name.clone(), kind);
        let Some(slot) = state.slots.get(&key) else {
            state.metrics.misses += 1;
            return None;
        };
        match slot.handle.upgrade() {
            Some(graph) => {
                let owner = slot.owner.clone();
                state.retain(key, &graph);
                state.metrics.hits += 1;
                Some(CachedGraph { owner, graph })
            }
            None => {
                debug!("Cached {} '{}' is stale", kind, name);
                state.metrics.stale += 1;
                None
            }
        }
    }

    /// Unconditionally replace the slot for `graph`'s class. Returns the
    /// previous owner of that slot.
    pub fn insert(
        &self,
        name: GraphName,
        owner: RegisteredProvider,
        graph: &GraphRef,
    ) -> Option<RegisteredProvider> {
        let mut state = self.state.lock();
        let key = (name, graph.kind());
        let previous = state.slots.get(&key).map(|slot| slot.owner.clone());
        state.store(key, owner, graph);
        previous
    }

    /// Record a freshly resolved handle, keeping a single live instance per
    /// name and class.
    ///
    /// - If `owner` is no longer registered (per `is_registered`, checked
    ///   under the cache lock), nothing is cached and `None` is returned.
    /// - If the slot holds a live handle from a provider ranking at least
    ///   as high as `owner`, that handle is returned and `graph` is dropped.
    /// - Otherwise `graph` takes the slot and is returned.
    pub fn publish(
        &self,
        name: &GraphName,
        owner: &RegisteredProvider,
        graph: GraphRef,
        is_registered: impl FnOnce(&RegisteredProvider) -> bool,
    ) -> Option<GraphRef> {
        let mut state = self.state.lock();
        if !is_registered(owner) {
            debug!(
                "Discarding '{}' from deregistered provider '{}'",
                name,
                owner.name()
            );
            return None;
        }

        let key = (name.clone(), graph.kind());
        if let Some(slot) = state.slots.get(&key) {
            if slot.owner.ranks_at_least(owner) {
                if let Some(existing) = slot.handle.upgrade() {
                    state.retain(key, &existing);
                    return Some(existing);
                }
            }
        }

        state.store(key, owner.clone(), &graph);
        Some(graph)
    }

    /// Drop both slots of `name`. Returns how many were present.
    pub fn remove(&self, name: &GraphName) -> usize {
        self.state.lock().forget_where(name, |_| true)
    }

    /// Drop the slots of `name` filled by `owner`. Returns how many.
    pub fn remove_owned_by(&self, name: &GraphName, owner: &RegisteredProvider) -> usize {
        self.state
            .lock()
            .forget_where(name, |slot| slot.owner.same_registration(owner))
    }

    /// Drop the slots of `name` filled by providers `owner` outranks.
    pub fn remove_outranked_by(&self, name: &GraphName, owner: &RegisteredProvider) -> usize {
        self.state
            .lock()
            .forget_where(name, |slot| owner.outranks(&slot.owner))
    }

    /// Names with at least one slot filled by `owner`.
    pub fn names_owned_by(&self, owner: &RegisteredProvider) -> Vec<GraphName> {
        let state = self.state.lock();
        let mut names: Vec<GraphName> = state
            .slots
            .iter()
            .filter(|(_, slot)| slot.owner.same_registration(owner))
            .map(|((name, _), _)| name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Drop every slot whose handle was reclaimed. Returns how many.
    pub fn purge_stale(&self) -> usize {
        let mut state = self.state.lock();
        let before = state.slots.len();
        state.slots.retain(|_, slot| slot.handle.strong_count() > 0);
        before - state.slots.len()
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.slots.clear();
        state.retained.clear();
    }

    /// Number of slots, stale ones included.
    pub fn len(&self) -> usize {
        self.state.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of handles kept alive by the LRU.
    pub fn retained_len(&self) -> usize {
        self.state.lock().retained.len()
    }

    /// Get a snapshot of cache metrics
    pub fn metrics(&self) -> CacheMetrics {
        self.state.lock().metrics.clone()
    }

    /// Reset cache metrics
    pub fn reset_metrics(&self) {
        self.state.lock().metrics = CacheMetrics::default();
    }
}
