// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::io;
use std::path::Path;
use std::sync::OnceLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub const DEFAULT_LOG_FILTER: &str = "devicemap_node=info,devicemap_cli=info";

/// Initialize logging. `RUST_LOG` wins over `default_filter`.
pub fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

/// Install the Prometheus recorder. Safe to call more than once.
pub fn init_metrics() {
    if PROM_HANDLE.get().is_some() {
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROM_HANDLE.set(handle).is_err() {
                tracing::warn!("Prometheus handle already set. Telemetry re-initialized?");
            }
        }
        Err(e) => {
            tracing::warn!("Failed to install Prometheus recorder: {}", e);
            return;
        }
    }

    metrics::describe_counter!("devicemap_entries_scanned_total", "Log sequence numbers visited");
    metrics::describe_counter!("devicemap_keys_deleted_total", "Log keys deleted after consumption");
    metrics::describe_counter!("devicemap_lookups_total", "Classification calls, labelled by outcome");
    metrics::describe_counter!("devicemap_results_published_total", "ua-<hash> keys written, summed over nodes");
    metrics::describe_counter!("devicemap_nodes_aborted_total", "Nodes excluded from a run");
    metrics::describe_gauge!("devicemap_last_run_timestamp_seconds", "Unix time the last run finished");
    metrics::describe_histogram!("devicemap_run_duration_seconds", "Wall-clock time of one run");
}

/// Prometheus text exposition of everything recorded so far.
pub fn get_metrics() -> String {
    if let Some(handle) = PROM_HANDLE.get() {
        handle.render()
    } else {
        "# metrics not initialized".to_string()
    }
}

/// Writes [`get_metrics`] to `path` through a sibling temp file and a rename,
/// so a textfile collector never reads a half-written file.
pub fn write_metrics(path: &Path) -> io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    std::fs::write(&tmp, get_metrics())?;
    std::fs::rename(&tmp, path)
}
