//! graphmux Configuration Management
//!
//! Provides configuration loading with support for:
//! - Global config: `~/.graphmux/config.toml`
//! - Local config: `.graphmux/config.toml` (in the working directory)
//! - CLI overrides via `ConfigOverrides`
//!
//! Configuration is merged in order: global → local → CLI overrides.

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::ConfigLoader;

use graphmux_core::{GraphKind, GraphName, Term, Triple};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Default number of graphs the multiplexer cache keeps alive.
pub const DEFAULT_RETAIN_CAPACITY: usize = 256;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Root configuration for graphmux.
///
/// Represents the fully merged configuration from all sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct MuxConfig {
    /// Graph cache configuration
    pub cache: CacheConfig,

    /// Lock-discipline checking
    pub locking: LockingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// In-memory providers to register at startup
    pub providers: Vec<ProviderConfig>,
}

/// Graph cache configuration.
///
/// # Example TOML
///
/// ```toml
/// [cache]
/// retain_capacity = 256
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    /// How many recently resolved graphs the cache keeps alive
    pub retain_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            retain_capacity: DEFAULT_RETAIN_CAPACITY,
        }
    }
}

/// Lock-discipline checking configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct LockingConfig {
    /// Wrap configured graphs so unguarded access is reported.
    ///
    /// Only honored by builds with lock checking compiled in.
    pub checked: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error, off)
    pub level: String,

    /// Log format (text, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON structured logging
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::UnknownLogFormat {
                format: s.to_string(),
            }),
        }
    }
}

/// An in-memory provider declared in configuration.
///
/// # Example TOML
///
/// ```toml
/// [[providers]]
/// name = "overlay"
/// weight = 50
/// read_only = true
///
/// [[providers.graphs]]
/// name = "urn:example:g"
/// kind = "immutable"
/// triples = [["urn:example:s", "urn:example:p", "\"value\""]]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    /// Display name, unique among configured providers
    pub name: String,

    /// Priority; heavier providers win contested names
    pub weight: i32,

    /// Refuse graph creation and deletion
    pub read_only: bool,

    /// Graphs the provider starts with
    pub graphs: Vec<GraphSeedConfig>,
}

/// A graph a configured provider is seeded with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphSeedConfig {
    /// Graph name (absolute IRI)
    pub name: GraphName,

    /// Mutability class
    #[serde(default = "default_seed_kind")]
    pub kind: GraphKind,

    /// Triples as `[subject, predicate, object]` in compact term syntax
    #[serde(default)]
    pub triples: Vec<[String; 3]>,
}

fn default_seed_kind() -> GraphKind {
    GraphKind::Mutable
}

impl GraphSeedConfig {
    /// Parse the seed triples, rejecting any that are not well formed.
    pub fn triples(&self) -> Result<Vec<Triple>, ConfigError> {
        self.triples
            .iter()
            .enumerate()
            .map(|(i, [s, p, o])| {
                let triple = Triple::new(Term::parse(s), Term::parse(p), Term::parse(o));
                if triple.is_well_formed() {
                    Ok(triple)
                } else {
                    Err(ConfigError::MalformedTriple {
                        graph: self.name.clone(),
                        index: i,
                        triple: triple.to_string(),
                    })
                }
            })
            .collect()
    }
}

/// CLI overrides for configuration values.
///
/// Used to apply command-line arguments over file-based config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override cache retention capacity
    pub retain_capacity: Option<usize>,

    /// Override lock checking
    pub checked: Option<bool>,

    /// Override log level
    pub log_level: Option<String>,

    /// Override log format
    pub log_format: Option<LogFormat>,
}

impl MuxConfig {
    /// Apply CLI overrides to this configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(capacity) = overrides.retain_capacity {
            self.cache.retain_capacity = capacity;
        }

        if let Some(checked) = overrides.checked {
            self.locking.checked = checked;
        }

        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }

        if let Some(format) = overrides.log_format {
            self.logging.format = format;
        }
    }

    /// Validate the configuration.
    ///
    /// Graph names are checked when parsed; this covers everything that
    /// depends on more than one value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.retain_capacity == 0 {
            return Err(ConfigError::ZeroRetainCapacity);
        }

        let level = self.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::UnknownLogLevel {
                level: self.logging.level.clone(),
            });
        }

        let mut provider_names = HashSet::new();
        for (index, provider) in self.providers.iter().enumerate() {
            if provider.name.trim().is_empty() {
                return Err(ConfigError::UnnamedProvider { index });
            }
            if !provider_names.insert(provider.name.as_str()) {
                return Err(ConfigError::duplicate_provider(&provider.name));
            }

            let mut graph_names = HashSet::new();
            for seed in &provider.graphs {
                if !graph_names.insert(&seed.name) {
                    return Err(ConfigError::duplicate_seed(&provider.name, &seed.name));
                }
                seed.triples()?;
            }
        }

        Ok(())
    }

    /// Look up a configured provider by name.
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.name == name)
    }

    /// Render as pretty-printed TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
