//! Provider and listener traits.

use std::collections::BTreeSet;
use std::sync::Arc;

use graphmux_core::{Graph, GraphKind, GraphName, GraphRef, Triple};

use crate::error::ProviderError;

/// A source of named graphs.
///
/// Providers are registered with a [`Multiplexer`](crate::Multiplexer)
/// under a fixed integer weight. When several providers serve the same
/// name, the highest-weight one is authoritative.
///
/// Methods answer with [`ProviderError`] variants to say "not here"
/// (`NotFound`, `WrongKind`), "not me" (`Unsupported`), or "already taken"
/// (`Conflict`); the multiplexer treats these as signals to ask the next
/// provider. Anything else is a fault and surfaces to the caller.
///
/// Providers are compared by identity (the `Arc` they were registered
/// with), never by name.
pub trait Provider: Send + Sync {
    /// Display name, used in logs and monitoring output.
    fn name(&self) -> &str;

    /// Priority. Read once at registration.
    fn weight(&self) -> i32;

    /// Names of mutable graphs this provider serves.
    fn list_mutable_graphs(&self) -> Result<BTreeSet<GraphName>, ProviderError>;

    /// Names of immutable graphs this provider serves.
    fn list_immutable_graphs(&self) -> Result<BTreeSet<GraphName>, ProviderError>;

    /// Every name this provider serves.
    fn list_graphs(&self) -> Result<BTreeSet<GraphName>, ProviderError> {
        let mut names = self.list_mutable_graphs()?;
        names.extend(self.list_immutable_graphs()?);
        Ok(names)
    }

    fn get_mutable(&self, name: &GraphName) -> Result<GraphRef, ProviderError>;

    fn get_immutable(&self, name: &GraphName) -> Result<GraphRef, ProviderError>;

    /// The graph under `name`, whichever class it is.
    fn get_graph(&self, name: &GraphName) -> Result<GraphRef, ProviderError> {
        match self.get_mutable(name) {
            Err(ProviderError::NotFound { .. }) | Err(ProviderError::WrongKind { .. }) => {
                self.get_immutable(name)
            }
            other => other,
        }
    }

    fn create_mutable(&self, name: &GraphName) -> Result<GraphRef, ProviderError>;

    fn create_immutable(
        &self,
        name: &GraphName,
        triples: Vec<Triple>,
    ) -> Result<GraphRef, ProviderError>;

    fn delete(&self, name: &GraphName) -> Result<(), ProviderError>;

    /// Every name under which this provider serves `graph` (compared by
    /// identity).
    fn names_of(&self, _graph: &Graph) -> BTreeSet<GraphName> {
        BTreeSet::new()
    }
}

/// Receives graph appearance and disappearance notifications.
///
/// Callbacks run on the thread that caused the change, after the
/// multiplexer has released its internal locks. They may call back into
/// the multiplexer.
pub trait GraphListener: Send + Sync {
    /// A name became served, either newly or by a different provider.
    fn graph_appeared(&self, name: &GraphName, kind: GraphKind);

    /// A name stopped being served by its previous owner.
    fn graph_disappeared(&self, name: &GraphName);
}

/// True if both handles are the same provider instance.
pub fn same_provider(a: &Arc<dyn Provider>, b: &Arc<dyn Provider>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
