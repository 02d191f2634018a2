// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use clap::Parser;
use devicemap_cli::args::{Cli, Commands};
use devicemap_cli::commands::{inspect, lookup, resolve};
use devicemap_node::telemetry::{init_tracing, DEFAULT_LOG_FILTER};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(DEFAULT_LOG_FILTER);
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve(args) => resolve::run(&args).await.map(|_| ()),
        Commands::Lookup(args) => lookup::run(&args).await,
        Commands::Inspect(args) => inspect::run(&args).await,
    }
}
