// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Command line surface. Every flag has a `DEVICEMAP_*` environment fallback
//! so the resolver can run from cron with nothing but an environment file.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use devicemap_kernel::config::DEFAULT_MAX_BATCH_SIZE;
use devicemap_node::config::{ResolverConfig, DEFAULT_ENDPOINT, DEFAULT_USER_AGENT};

#[derive(Parser, Debug)]
#[command(name = "devicemap", version)]
#[command(about = "Resolve User-Agent strings logged by edge caches into device types", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one reconciliation pass over the given cache nodes
    Resolve(ResolveArgs),
    /// Classify a single User-Agent string
    Lookup(LookupArgs),
    /// Show the log cursor of each cache node without changing anything
    Inspect(InspectArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServiceArgs {
    /// Classification service base URL
    #[arg(long, env = "DEVICEMAP_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Per-request timeout in milliseconds
    #[arg(long, env = "DEVICEMAP_REQUEST_TIMEOUT_MS", default_value_t = 2000)]
    pub request_timeout_ms: u64,

    /// User-Agent header sent to the classification service
    #[arg(long, env = "DEVICEMAP_CLIENT_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub client_user_agent: String,
}

impl ServiceArgs {
    fn apply(&self, cfg: &mut ResolverConfig) {
        cfg.endpoint = self.endpoint.clone();
        cfg.request_timeout = Duration::from_millis(self.request_timeout_ms);
        cfg.user_agent = self.client_user_agent.clone();
    }
}

#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Licence key for the classification service
    #[arg(long, env = "DEVICEMAP_LICENCE_KEY", hide_env_values = true)]
    pub licence_key: String,

    /// Cache node address, `host` or `host:port`. Repeat or comma-separate.
    #[arg(long = "node", env = "DEVICEMAP_NODES", value_delimiter = ',', required = true)]
    pub nodes: Vec<String>,

    #[command(flatten)]
    pub service: ServiceArgs,

    /// Most log entries taken from one node per run
    #[arg(long, env = "DEVICEMAP_MAX_BATCH_SIZE", default_value_t = DEFAULT_MAX_BATCH_SIZE)]
    pub max_batch_size: u64,

    /// Lookups in flight at once
    #[arg(long, env = "DEVICEMAP_CONCURRENCY", default_value_t = 8)]
    pub concurrency: usize,

    /// Connect and per-operation timeout for cache nodes, in milliseconds
    #[arg(long, env = "DEVICEMAP_NODE_TIMEOUT_MS", default_value_t = 1000)]
    pub node_timeout_ms: u64,

    /// Print the full run report as JSON
    #[arg(long)]
    pub json: bool,

    /// Write Prometheus metrics here after the run (textfile collector format)
    #[arg(long, env = "DEVICEMAP_METRICS_FILE")]
    pub metrics_file: Option<PathBuf>,
}

impl ResolveArgs {
    pub fn config(&self) -> ResolverConfig {
        let mut cfg = ResolverConfig::with_licence_key(self.licence_key.clone());
        self.service.apply(&mut cfg);
        cfg.max_batch_size = self.max_batch_size;
        cfg.max_concurrent_lookups = self.concurrency;
        cfg.node_timeout = Duration::from_millis(self.node_timeout_ms);
        cfg
    }
}

#[derive(Args, Debug, Clone)]
pub struct LookupArgs {
    pub licence_key: String,
    pub user_agent: String,

    #[command(flatten)]
    pub service: ServiceArgs,

    /// Print the properties and device type as JSON
    #[arg(long)]
    pub json: bool,
}

impl LookupArgs {
    pub fn config(&self) -> ResolverConfig {
        let mut cfg = ResolverConfig::with_licence_key(self.licence_key.clone());
        self.service.apply(&mut cfg);
        cfg
    }
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// Cache node addresses
    #[arg(required = true)]
    pub nodes: Vec<String>,

    /// Batch cap used to flag oversized backlogs
    #[arg(long, env = "DEVICEMAP_MAX_BATCH_SIZE", default_value_t = DEFAULT_MAX_BATCH_SIZE)]
    pub max_batch_size: u64,

    #[arg(long, env = "DEVICEMAP_NODE_TIMEOUT_MS", default_value_t = 1000)]
    pub node_timeout_ms: u64,
}
