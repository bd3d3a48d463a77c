//! Errors raised while reading, writing or checking a multiplexer config.

use std::path::PathBuf;

use graphmux_core::GraphName;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Writing the file or creating its directory failed
    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    /// No home directory, so there is no global config location
    #[error("could not determine home directory")]
    NoHomeDir,

    #[error("cache.retain_capacity must be at least 1")]
    ZeroRetainCapacity,

    #[error("unknown log level '{level}'. Valid values: {}", crate::LOG_LEVELS.join(", "))]
    UnknownLogLevel { level: String },

    #[error("unknown log format '{format}'. Valid values: text, json")]
    UnknownLogFormat { format: String },

    /// A `[[providers]]` table with a blank name; `index` counts from zero
    #[error("provider #{index} has no name")]
    UnnamedProvider { index: usize },

    #[error("duplicate provider '{name}'")]
    DuplicateProvider { name: String },

    #[error("provider '{provider}' declares graph '{graph}' more than once")]
    DuplicateSeed { provider: String, graph: GraphName },

    #[error("graph '{graph}' triple {index}: '{triple}' is not a valid triple")]
    MalformedTriple {
        graph: GraphName,
        index: usize,
        triple: String,
    },
}

impl ConfigError {
    /// Create a ReadFile error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create a ParseToml error.
    pub fn parse_toml(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        Self::ParseToml {
            path: path.into(),
            source,
        }
    }

    /// Create a Write error.
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Create a DuplicateProvider error.
    pub fn duplicate_provider(name: impl Into<String>) -> Self {
        Self::DuplicateProvider { name: name.into() }
    }

    /// Create a DuplicateSeed error.
    pub fn duplicate_seed(provider: impl Into<String>, graph: &GraphName) -> Self {
        Self::DuplicateSeed {
            provider: provider.into(),
            graph: graph.clone(),
        }
    }

    /// The provider this error is about, if any.
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::DuplicateProvider { name } => Some(name),
            Self::DuplicateSeed { provider, .. } => Some(provider),
            _ => None,
        }
    }
}
