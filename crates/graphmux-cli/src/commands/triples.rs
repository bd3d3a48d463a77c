//! Triples command - Print the triples of a graph

use anyhow::Result;
use clap::Args;
use graphmux_config::MuxConfig;
use graphmux_core::{Term, TriplePattern};

use super::resolve::fetch;
use super::{build_multiplexer, parse_graph_name, print_info, print_json};
use crate::GlobalOptions;

/// Arguments for the triples command
#[derive(Args, Debug)]
pub struct TriplesArgs {
    /// Graph name (absolute IRI)
    pub name: String,

    /// Only triples with this subject
    #[arg(long, short = 's')]
    pub subject: Option<String>,

    /// Only triples with this predicate
    #[arg(long, short = 'p')]
    pub predicate: Option<String>,

    /// Only triples with this object (`"text"` for a literal)
    #[arg(long, short = 'o')]
    pub object: Option<String>,

    /// Read from the immutable view
    #[arg(long)]
    pub immutable: bool,

    /// Maximum number of triples to print
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
}

impl TriplesArgs {
    fn pattern(&self) -> TriplePattern {
        TriplePattern::new(
            self.subject.as_deref().map(Term::parse),
            self.predicate.as_deref().map(Term::parse),
            self.object.as_deref().map(Term::parse),
        )
    }
}

/// Execute the triples command
pub fn execute(args: TriplesArgs, config: &MuxConfig, global: &GlobalOptions) -> Result<()> {
    let name = parse_graph_name(&args.name)?;
    let mux = build_multiplexer(config)?;
    let graph = fetch(&mux, &name, false, args.immutable)?;

    let mut triples = {
        let _hold = graph.read();
        graph.filter(&args.pattern())?
    };
    let total = triples.len();
    if let Some(limit) = args.limit {
        triples.truncate(limit);
    }

    if global.json {
        return print_json(&triples);
    }

    for triple in &triples {
        println!("{}", triple);
    }
    if triples.len() < total {
        print_info(
            &format!("Showing {} of {} triples", triples.len(), total),
            global.quiet,
        );
    }
    Ok(())
}
