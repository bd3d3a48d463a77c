//! graphmux CLI - Inspect a multiplexed stack of named-graph providers
//!
//! Builds a multiplexer from the providers declared in configuration and
//! reports how graph names resolve across them.
//!
//! # Usage
//!
//! ```bash
//! # List providers in priority order
//! graphmux providers
//!
//! # Show which provider serves a graph
//! graphmux resolve urn:example:g
//!
//! # Dump triples matching a pattern
//! graphmux triples urn:example:g --predicate urn:example:p
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use graphmux_config::{ConfigOverrides, LogFormat, MuxConfig};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod commands;

/// graphmux - Weighted multiplexing of named-graph providers
#[derive(Parser, Debug)]
#[command(name = "graphmux")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Args, Debug, Clone)]
struct GlobalOptions {
    /// Path to configuration file (skips global and local lookup)
    #[arg(long, short = 'c', global = true, env = "GRAPHMUX_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Override the number of graphs the cache keeps alive
    #[arg(long, global = true, env = "GRAPHMUX_RETAIN_CAPACITY")]
    retain_capacity: Option<usize>,

    /// Report unguarded access to configured graphs
    #[arg(long, global = true)]
    checked: bool,
}

impl GlobalOptions {
    /// Convert global options to config overrides
    pub fn to_config_overrides(&self) -> ConfigOverrides {
        let log_level = if self.quiet {
            Some("error".to_string())
        } else if self.verbose {
            Some("debug".to_string())
        } else {
            None
        };

        ConfigOverrides {
            retain_capacity: self.retain_capacity,
            checked: self.checked.then_some(true),
            log_level,
            ..Default::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List registered providers from highest to lowest priority
    Providers,

    /// List graph names with the provider serving each
    Graphs(commands::graphs::GraphsArgs),

    /// Show which provider serves a graph name
    Resolve(commands::resolve::ResolveArgs),

    /// Print the triples of a graph
    Triples(commands::triples::TriplesArgs),

    /// View and manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config commands must work even when the config itself is broken
    let config = commands::load_config(&cli.global);
    init_logging(&cli.global, config.as_ref().ok());

    match cli.command {
        Commands::Config(cmd) => commands::config::execute(cmd, &cli.global),
        Commands::Providers => commands::providers::execute(&config?, &cli.global),
        Commands::Graphs(args) => commands::graphs::execute(args, &config?, &cli.global),
        Commands::Resolve(args) => commands::resolve::execute(args, &config?, &cli.global),
        Commands::Triples(args) => commands::triples::execute(args, &config?, &cli.global),
    }
}

/// Install the stderr subscriber.
///
/// `--verbose`/`--quiet` win, then `RUST_LOG`, then `[logging] level`.
fn init_logging(global: &GlobalOptions, config: Option<&MuxConfig>) {
    let configured = config.map(|c| c.logging.level.as_str()).unwrap_or("info");
    let filter = match global.to_config_overrides().log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::default().add_directive(
                configured
                    .parse::<LevelFilter>()
                    .unwrap_or(LevelFilter::INFO)
                    .into(),
            )
        }),
    };

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let format = config.map(|c| c.logging.format).unwrap_or_default();
    let result = match format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
        LogFormat::Text => {
            tracing::subscriber::set_global_default(builder.with_ansi(true).finish())
        }
    };
    if let Err(e) = result {
        eprintln!("warning: logging already initialized: {}", e);
    }
}
