//! Providers command - List registered providers in priority order

use anyhow::Result;
use graphmux_config::MuxConfig;

use super::{build_multiplexer, print_info, print_json};
use crate::GlobalOptions;

/// Execute the providers command
pub fn execute(config: &MuxConfig, global: &GlobalOptions) -> Result<()> {
    let mux = build_multiplexer(config)?;
    let providers = mux.providers();

    if global.json {
        return print_json(&providers);
    }

    if providers.is_empty() {
        print_info(
            "No providers configured. Add a [[providers]] section to .graphmux/config.toml",
            global.quiet,
        );
        return Ok(());
    }

    println!("{:<4} {:<24} {:>8}", "#", "PROVIDER", "WEIGHT");
    for (rank, provider) in providers.iter().enumerate() {
        println!("{:<4} {:<24} {:>8}", rank + 1, provider.name, provider.weight);
    }
    Ok(())
}
