//! Provider registry.
//!
//! Keeps registered providers in priority order: weight descending, then
//! registration sequence ascending, so among equal weights the provider
//! registered first wins. This ordering is the only authority on which
//! provider owns a contested name.
//!
//! The list is copy-on-write behind a `parking_lot::RwLock`, so iteration
//! works on a stable snapshot and never holds the lock while providers are
//! being called.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use graphmux_core::GraphName;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::warn;

use crate::traits::{same_provider, Provider};

/// A provider together with its registration metadata.
#[derive(Clone)]
pub struct RegisteredProvider {
    sequence: u64,
    weight: i32,
    provider: Arc<dyn Provider>,
}

impl RegisteredProvider {
    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn name(&self) -> &str {
        self.provider.name()
    }

    /// Weight captured at registration.
    pub fn weight(&self) -> i32 {
        self.weight
    }

    /// Registration sequence number, unique per registry.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// True if this entry wraps `provider`.
    pub fn is(&self, provider: &Arc<dyn Provider>) -> bool {
        same_provider(&self.provider, provider)
    }

    /// True if this entry and `other` are the same registration.
    pub fn same_registration(&self, other: &RegisteredProvider) -> bool {
        self.sequence == other.sequence
    }

    /// True if this entry has strictly higher priority than `other`.
    pub fn outranks(&self, other: &RegisteredProvider) -> bool {
        self.rank_key() < other.rank_key()
    }

    /// True if this entry has priority at least as high as `other`.
    pub fn ranks_at_least(&self, other: &RegisteredProvider) -> bool {
        self.rank_key() <= other.rank_key()
    }

    /// Sort key: smaller sorts first and wins.
    fn rank_key(&self) -> (std::cmp::Reverse<i32>, u64) {
        (std::cmp::Reverse(self.weight), self.sequence)
    }

    pub fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: self.name().to_string(),
            weight: self.weight,
            sequence: self.sequence,
        }
    }
}

impl fmt::Debug for RegisteredProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredProvider")
            .field("name", &self.name())
            .field("weight", &self.weight)
            .field("sequence", &self.sequence)
            .finish()
    }
}

/// Monitoring record for one registered provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderInfo {
    /// Provider display name
    pub name: String,
    /// Weight captured at registration
    pub weight: i32,
    /// Registration sequence (lower registered earlier)
    pub sequence: u64,
}

/// Result of removing a provider from the registry.
#[derive(Debug)]
pub struct Deregistration {
    /// The entry that was removed
    pub entry: RegisteredProvider,
    /// Names the provider advertised at removal time
    pub names: BTreeSet<GraphName>,
}

#[derive(Default)]
struct RegistryState {
    providers: Arc<Vec<RegisteredProvider>>,
    next_sequence: u64,
}

/// Ordered set of registered providers.
#[derive(Default)]
pub struct ProviderRegistry {
    state: RwLock<RegistryState>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider. Returns `None` if this instance is already registered.
    pub fn register(&self, provider: Arc<dyn Provider>) -> Option<RegisteredProvider> {
        let mut state = self.state.write();
        if state.providers.iter().any(|entry| entry.is(&provider)) {
            return None;
        }

        let entry = RegisteredProvider {
            sequence: state.next_sequence,
            weight: provider.weight(),
            provider,
        };
        state.next_sequence += 1;

        let mut providers = Vec::clone(&state.providers);
        // After every provider of equal or greater weight: FIFO on ties
        let position = providers.partition_point(|p| p.weight >= entry.weight);
        providers.insert(position, entry.clone());
        state.providers = Arc::new(providers);

        Some(entry)
    }

    /// Remove a provider by identity.
    ///
    /// The provider's names are listed after it has left the registry and
    /// outside the registry lock. A listing failure is logged and yields an
    /// empty name set; the provider is removed regardless.
    pub fn deregister(&self, provider: &Arc<dyn Provider>) -> Option<Deregistration> {
        let entry = {
            let mut state = self.state.write();
            let position = state.providers.iter().position(|p| p.is(provider))?;
            let mut providers = Vec::clone(&state.providers);
            let entry = providers.remove(position);
            state.providers = Arc::new(providers);
            entry
        };

        let names = match entry.provider.list_graphs() {
            Ok(names) => names,
            Err(e) => {
                warn!(
                    "Listing graphs of deregistered provider '{}' failed: {}",
                    entry.name(),
                    e
                );
                BTreeSet::new()
            }
        };

        Some(Deregistration { entry, names })
    }

    /// Providers from highest to lowest priority.
    ///
    /// The iterator walks a snapshot taken now; clone it to restart.
    pub fn providers_descending(&self) -> ProviderIter {
        ProviderIter {
            providers: Arc::clone(&self.state.read().providers),
            position: 0,
        }
    }

    /// The registration entry for `provider`, if registered.
    pub fn find(&self, provider: &Arc<dyn Provider>) -> Option<RegisteredProvider> {
        self.state
            .read()
            .providers
            .iter()
            .find(|p| p.is(provider))
            .cloned()
    }

    pub fn contains(&self, provider: &Arc<dyn Provider>) -> bool {
        self.find(provider).is_some()
    }

    /// True if the registration `entry` is still live.
    pub fn is_registered(&self, entry: &RegisteredProvider) -> bool {
        self.state
            .read()
            .providers
            .iter()
            .any(|p| p.same_registration(entry))
    }

    /// Registered providers ranking strictly below `entry`, highest first.
    pub fn lower_ranked_than(&self, entry: &RegisteredProvider) -> Vec<RegisteredProvider> {
        self.state
            .read()
            .providers
            .iter()
            .filter(|p| entry.outranks(p))
            .cloned()
            .collect()
    }

    /// Monitoring snapshot in priority order.
    pub fn snapshot(&self) -> Vec<ProviderInfo> {
        self.state
            .read()
            .providers
            .iter()
            .map(RegisteredProvider::info)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Restartable iterator over a registry snapshot, highest priority first.
#[derive(Clone)]
pub struct ProviderIter {
    providers: Arc<Vec<RegisteredProvider>>,
    position: usize,
}

impl Iterator for ProviderIter {
    type Item = RegisteredProvider;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.providers.get(self.position)?.clone();
        self.position += 1;
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.providers.len().saturating_sub(self.position);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ProviderIter {}
