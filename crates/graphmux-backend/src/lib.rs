//! graphmux backend - weighted provider multiplexing for named graphs
//!
//! This crate turns any number of graph providers into one namespace:
//! - Providers register with an integer weight; for each graph name the
//!   highest-weight provider serving it is authoritative
//! - Resolved handles are cached so every caller sees the same instance
//! - Registering or removing a provider re-resolves the names it serves
//!   and notifies listeners
//!
//! ## Components
//!
//! - [`Provider`]: a source of named graphs
//! - [`ProviderRegistry`]: providers in priority order
//! - [`GraphCache`]: one weak handle per name and class, with LRU retention
//! - [`Multiplexer`]: resolution, creation, deletion and notifications
//! - [`MemoryProvider`]: in-memory provider for configuration and tests
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use graphmux_backend::{MemoryProvider, Multiplexer};
//! use graphmux_core::{GraphName, Triple};
//!
//! let mux = Multiplexer::new();
//! mux.register_provider(Arc::new(MemoryProvider::new("scratch", 10)));
//!
//! let name = GraphName::new("urn:example:g").unwrap();
//! let graph = mux.create_mutable_graph(&name).unwrap();
//! graph.insert(Triple::iris("urn:s", "urn:p", "urn:o")).unwrap();
//!
//! let again = mux.get_mutable_graph(&name).unwrap();
//! assert!(Arc::ptr_eq(&graph, &again));
//! ```

mod cache;
mod error;
mod memory;
mod multiplexer;
mod registry;
mod traits;

pub use cache::{CacheMetrics, CachedGraph, GraphCache, DEFAULT_RETAIN_CAPACITY};
pub use error::{MultiplexerError, ProviderError};
pub use memory::MemoryProvider;
pub use multiplexer::{memory_provider_from_config, Multiplexer};
pub use registry::{Deregistration, ProviderInfo, ProviderIter, ProviderRegistry, RegisteredProvider};
pub use traits::{same_provider, GraphListener, Provider};

/// Result type for multiplexer operations.
pub type Result<T> = std::result::Result<T, MultiplexerError>;
