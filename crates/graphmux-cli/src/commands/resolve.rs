//! Resolve command - Show which provider serves a graph name

use anyhow::{Context, Result};
use clap::Args;
use graphmux_backend::{Multiplexer, ProviderInfo};
use graphmux_config::MuxConfig;
use graphmux_core::{GraphKind, GraphName, GraphRef};
use serde::Serialize;

use super::{build_multiplexer, parse_graph_name, print_json};
use crate::GlobalOptions;

/// Arguments for the resolve command
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Graph name (absolute IRI)
    pub name: String,

    /// Require a mutable graph
    #[arg(long, conflicts_with = "immutable")]
    pub mutable: bool,

    /// Ask for an immutable view (snapshots a mutable graph if needed)
    #[arg(long)]
    pub immutable: bool,
}

/// Resolution outcome for one name
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub name: GraphName,
    pub provider: Option<ProviderInfo>,
    pub kind: GraphKind,
    pub triples: usize,
}

/// Fetch the graph the flags ask for.
pub fn fetch(
    mux: &Multiplexer,
    name: &GraphName,
    mutable: bool,
    immutable: bool,
) -> Result<GraphRef> {
    let graph = if mutable {
        mux.get_mutable_graph(name)
    } else if immutable {
        mux.get_immutable_graph(name)
    } else {
        mux.get_graph(name)
    };
    graph.with_context(|| format!("Failed to resolve '{}'", name))
}

/// Execute the resolve command
pub fn execute(args: ResolveArgs, config: &MuxConfig, global: &GlobalOptions) -> Result<()> {
    let name = parse_graph_name(&args.name)?;
    let mux = build_multiplexer(config)?;

    let graph = fetch(&mux, &name, args.mutable, args.immutable)?;
    let triples = {
        let _hold = graph.read();
        graph.len()?
    };
    let resolution = Resolution {
        provider: mux.owner_of(&name)?,
        kind: graph.kind(),
        triples,
        name,
    };

    if global.json {
        return print_json(&resolution);
    }

    match resolution.provider {
        Some(ref provider) => println!(
            "{} -> {} (weight {})",
            resolution.name, provider.name, provider.weight
        ),
        None => println!("{} -> (no provider)", resolution.name),
    }
    println!("  kind:    {}", resolution.kind);
    println!("  triples: {}", resolution.triples);
    Ok(())
}
