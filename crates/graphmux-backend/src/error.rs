//! Backend error types.

use graphmux_config::ConfigError;
use graphmux_core::{GraphError, GraphKind, GraphName};
use thiserror::Error;

/// Answers a provider gives when it cannot serve a request.
///
/// Most variants tell the multiplexer to ask the next provider; see
/// [`ProviderError::is_fallthrough`].
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider does not have this graph
    #[error("graph '{name}' not found")]
    NotFound { name: GraphName },

    /// The provider has the graph, but of the other mutability class
    #[error("graph '{name}' is {actual}")]
    WrongKind { name: GraphName, actual: GraphKind },

    /// The provider already has a graph with this name
    #[error("graph '{name}' already exists")]
    Conflict { name: GraphName },

    /// The provider does not implement this operation
    #[error("operation '{operation}' is not supported")]
    Unsupported { operation: &'static str },

    /// The provider refuses to delete the graph
    #[error("graph '{name}' cannot be deleted")]
    Undeletable { name: GraphName },

    /// Graph-level failure
    #[error("graph error: {0}")]
    Store(#[from] GraphError),

    /// Unexpected failure in the provider's backing system
    #[error("backend failure: {message}")]
    Backend { message: String },
}

impl ProviderError {
    /// Create a NotFound error.
    pub fn not_found(name: &GraphName) -> Self {
        Self::NotFound { name: name.clone() }
    }

    /// Create a WrongKind error.
    pub fn wrong_kind(name: &GraphName, actual: GraphKind) -> Self {
        Self::WrongKind {
            name: name.clone(),
            actual,
        }
    }

    /// Create a Conflict error.
    pub fn conflict(name: &GraphName) -> Self {
        Self::Conflict { name: name.clone() }
    }

    /// Create an Unsupported error.
    pub fn unsupported(operation: &'static str) -> Self {
        Self::Unsupported { operation }
    }

    /// Create an Undeletable error.
    pub fn undeletable(name: &GraphName) -> Self {
        Self::Undeletable { name: name.clone() }
    }

    /// Create a Backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// True when the multiplexer should move on to the next provider.
    pub fn is_fallthrough(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::WrongKind { .. }
                | Self::Conflict { .. }
                | Self::Unsupported { .. }
                | Self::Undeletable { .. }
        )
    }
}

/// Errors surfaced by the multiplexer.
#[derive(Error, Debug)]
pub enum MultiplexerError {
    /// No registered provider serves the name in the requested class
    #[error("no such graph: '{name}'")]
    NoSuchEntity { name: GraphName },

    /// The name is already owned at or above the creating provider's weight
    #[error("graph '{name}' already exists")]
    AlreadyExists { name: GraphName },

    /// No registered provider accepted the operation
    #[error("no provider supports '{operation}'")]
    Unsupported { operation: &'static str },

    /// The owning provider refuses deletion
    #[error("graph '{name}' cannot be deleted")]
    Undeletable { name: GraphName },

    /// Graph-level failure, including lock-discipline violations
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    /// Unexpected provider failure
    #[error("provider '{provider}' failed: {source}")]
    Provider {
        provider: String,
        #[source]
        source: ProviderError,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl MultiplexerError {
    /// Create a NoSuchEntity error.
    pub fn no_such_entity(name: &GraphName) -> Self {
        Self::NoSuchEntity { name: name.clone() }
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(name: &GraphName) -> Self {
        Self::AlreadyExists { name: name.clone() }
    }

    /// Create an Unsupported error.
    pub fn unsupported(operation: &'static str) -> Self {
        Self::Unsupported { operation }
    }

    /// Create an Undeletable error.
    pub fn undeletable(name: &GraphName) -> Self {
        Self::Undeletable { name: name.clone() }
    }

    /// Wrap an unexpected provider failure.
    pub fn provider(provider: impl Into<String>, source: ProviderError) -> Self {
        Self::Provider {
            provider: provider.into(),
            source,
        }
    }

    pub fn is_no_such_entity(&self) -> bool {
        matches!(self, Self::NoSuchEntity { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// True for lock-discipline violations reported by checked graphs.
    pub fn is_lock_violation(&self) -> bool {
        match self {
            Self::Graph(err) => err.is_lock_violation(),
            Self::Provider {
                source: ProviderError::Store(err),
                ..
            } => err.is_lock_violation(),
            _ => false,
        }
    }
}
