//! Graphs command - List graph names with the provider serving each

use anyhow::{Context, Result};
use clap::Args;
use graphmux_backend::Multiplexer;
use graphmux_config::MuxConfig;
use graphmux_core::{GraphKind, GraphName};
use serde::Serialize;

use super::{build_multiplexer, print_info, print_json};
use crate::GlobalOptions;

/// Arguments for the graphs command
#[derive(Args, Debug)]
pub struct GraphsArgs {
    /// Only list graphs some provider serves as mutable
    #[arg(long, conflicts_with = "immutable")]
    mutable: bool,

    /// Only list graphs some provider serves as immutable
    #[arg(long)]
    immutable: bool,
}

/// One row of the graph listing
#[derive(Debug, Clone, Serialize)]
pub struct GraphEntry {
    /// Graph name
    pub name: GraphName,
    /// Provider serving the name
    pub owner: Option<String>,
    /// Class of the graph the owner serves
    pub kind: Option<GraphKind>,
}

/// Execute the graphs command
pub fn execute(args: GraphsArgs, config: &MuxConfig, global: &GlobalOptions) -> Result<()> {
    let mux = build_multiplexer(config)?;

    let names = if args.mutable {
        mux.list_mutable_graph_names()
    } else if args.immutable {
        mux.list_immutable_graph_names()
    } else {
        mux.list_all_graph_names()
    }
    .context("Failed to list graphs")?;

    let entries = names
        .into_iter()
        .map(|name| describe(&mux, name))
        .collect::<Result<Vec<_>>>()?;

    if global.json {
        return print_json(&entries);
    }

    if entries.is_empty() {
        print_info("No graphs found", global.quiet);
        return Ok(());
    }

    println!("{:<48} {:<20} {}", "GRAPH", "PROVIDER", "KIND");
    for entry in &entries {
        println!(
            "{:<48} {:<20} {}",
            entry.name.as_str(),
            entry.owner.as_deref().unwrap_or("-"),
            entry.kind.map(|k| k.to_string()).unwrap_or_else(|| "-".to_string())
        );
    }
    Ok(())
}

fn describe(mux: &Multiplexer, name: GraphName) -> Result<GraphEntry> {
    let owner = mux
        .owner_of(&name)
        .with_context(|| format!("Failed to resolve '{}'", name))?;
    let kind = match mux.get_graph(&name) {
        Ok(graph) => Some(graph.kind()),
        Err(e) if e.is_no_such_entity() => None,
        Err(e) => return Err(e).with_context(|| format!("Failed to resolve '{}'", name)),
    };

    Ok(GraphEntry {
        name,
        owner: owner.map(|o| o.name),
        kind,
    })
}
