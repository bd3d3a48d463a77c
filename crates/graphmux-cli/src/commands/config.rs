//! Config command - View and manage configuration
//!
//! - Show the effective merged configuration
//! - Show configuration file paths
//! - Write a default configuration file

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use graphmux_config::ConfigLoader;
use serde::Serialize;

use super::{config_root, load_config, print_info, print_json};
use crate::GlobalOptions;

/// Config management commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration after merging all sources
    Show,

    /// Show configuration file paths
    Path,

    /// Write a default configuration file
    Init(InitArgs),
}

/// Arguments for the init command
#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Initialize the global config (~/.graphmux/config.toml) instead of local
    #[arg(long)]
    global: bool,
}

/// Configuration paths
#[derive(Debug, Clone, Serialize)]
pub struct ConfigPaths {
    /// Explicit config file from `--config`
    pub explicit: Option<PathBuf>,
    /// Global config file path
    pub global: Option<PathBuf>,
    /// Local config file path
    pub local: PathBuf,
    /// Whether global config exists
    pub global_exists: bool,
    /// Whether local config exists
    pub local_exists: bool,
}

/// Execute the config command
pub fn execute(cmd: ConfigCommand, global: &GlobalOptions) -> Result<()> {
    match cmd {
        ConfigCommand::Show => execute_show(global),
        ConfigCommand::Path => execute_path(global),
        ConfigCommand::Init(args) => execute_init(args, global),
    }
}

fn execute_show(global: &GlobalOptions) -> Result<()> {
    let config = load_config(global)?;
    if let Err(e) = config.validate() {
        print_info(&format!("warning: {}", e), global.quiet);
    }

    if global.json {
        return print_json(&config);
    }
    print!("{}", config.to_toml()?);
    Ok(())
}

fn execute_path(global: &GlobalOptions) -> Result<()> {
    let loader = ConfigLoader::new();
    let global_path = loader.global_config_path();
    let local = loader.local_config_path(&config_root()?);

    let paths = ConfigPaths {
        explicit: global.config.clone(),
        global_exists: global_path.as_ref().is_some_and(|p| p.exists()),
        global: global_path,
        local_exists: local.exists(),
        local,
    };

    if global.json {
        return print_json(&paths);
    }

    if let Some(ref explicit) = paths.explicit {
        println!("Explicit: {}", explicit.display());
    }
    match paths.global {
        Some(ref path) => println!(
            "Global:   {} {}",
            path.display(),
            exists_marker(paths.global_exists)
        ),
        None => println!("Global:   (no home directory)"),
    }
    println!(
        "Local:    {} {}",
        paths.local.display(),
        exists_marker(paths.local_exists)
    );
    Ok(())
}

fn execute_init(args: InitArgs, global: &GlobalOptions) -> Result<()> {
    let loader = ConfigLoader::new();
    let path = if args.global {
        loader.init_global()
    } else {
        loader.init_local(&config_root()?)
    }
    .context("Failed to initialize configuration")?;

    if global.json {
        return print_json(&serde_json::json!({ "path": path }));
    }
    println!("{}", path.display());
    print_info("Add [[providers]] sections to declare graph providers", global.quiet);
    Ok(())
}

fn exists_marker(exists: bool) -> &'static str {
    if exists {
        "(exists)"
    } else {
        "(not found)"
    }
}
