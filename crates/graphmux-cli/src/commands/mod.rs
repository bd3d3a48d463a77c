//! CLI command implementations

pub mod config;
pub mod graphs;
pub mod providers;
pub mod resolve;
pub mod triples;

use std::path::PathBuf;

use anyhow::{Context, Result};
use graphmux_backend::Multiplexer;
use graphmux_config::{ConfigLoader, MuxConfig};
use graphmux_core::GraphName;
use serde::Serialize;

use crate::GlobalOptions;

/// Directory whose `.graphmux/config.toml` is the local config.
pub fn config_root() -> Result<PathBuf> {
    std::env::current_dir().context("Failed to get current directory")
}

/// Load configuration, honoring `--config` and the CLI overrides.
pub fn load_config(global: &GlobalOptions) -> Result<MuxConfig> {
    let loader_overrides = global.to_config_overrides();

    if let Some(ref config_path) = global.config {
        return ConfigLoader::new()
            .load_file(config_path, Some(&loader_overrides))
            .with_context(|| format!("Failed to load config file {}", config_path.display()));
    }

    ConfigLoader::new()
        .load(&config_root()?, Some(&loader_overrides))
        .context("Failed to load configuration")
}

/// Build a multiplexer with every configured provider registered.
pub fn build_multiplexer(config: &MuxConfig) -> Result<Multiplexer> {
    Multiplexer::from_config(config).context("Failed to build providers from configuration")
}

/// Parse a graph name argument.
pub fn parse_graph_name(name: &str) -> Result<GraphName> {
    GraphName::new(name).with_context(|| format!("Invalid graph name '{}'", name))
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print an info message (respects quiet flag).
pub fn print_info(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{}", message);
    }
}
