// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::sync::Arc;

use anyhow::Context;
use comfy_table::Table;
use devicemap_node::network::ClassificationClient;
use devicemap_node::reconcile::Reconciler;
use devicemap_node::report::{NodeOutcome, RunReport};
use devicemap_node::telemetry::{init_metrics, write_metrics};

use super::{connect, opt, table};
use crate::args::ResolveArgs;

pub async fn run(args: &ResolveArgs) -> anyhow::Result<RunReport> {
    let cfg = args.config();
    cfg.validate()?;
    tracing::debug!("{:?}", cfg);
    if args.metrics_file.is_some() {
        init_metrics();
    }

    let client = ClassificationClient::new(&cfg)?;
    let nodes = connect(&args.nodes, cfg.node_timeout);
    let report = Reconciler::new(Arc::new(client), &cfg).run_once(&nodes).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", summary(&report));
        if !report.failed.is_empty() {
            println!("{} lookups failed and will be retried next run", report.failed.len());
        }
    }

    if let Some(path) = &args.metrics_file {
        write_metrics(path).with_context(|| format!("writing metrics to {}", path.display()))?;
    }

    if report.reachable_nodes() == 0 {
        anyhow::bail!("none of the {} cache nodes were reachable", report.nodes.len());
    }
    Ok(report)
}

pub fn summary(report: &RunReport) -> Table {
    let mut table = table(vec![
        "Node", "Outcome", "Window", "Identifiers", "Published", "Deleted", "Cursor", "Notes",
    ]);
    for node in &report.nodes {
        let outcome = match node.outcome {
            NodeOutcome::Completed => "OK",
            NodeOutcome::NothingLogged => "EMPTY",
            NodeOutcome::Aborted => "UNREACHABLE",
        };
        let window = node
            .window
            .filter(|w| !w.is_empty())
            .map(|w| format!("{}..={}", w.start, w.end - 1))
            .unwrap_or_else(|| "-".to_string());

        let mut notes = Vec::new();
        if let Some(e) = &node.error {
            notes.push(e.clone());
        }
        if let Some(from) = node.clamped_from {
            notes.push(format!("cursor {} clamped", from));
        }
        if let Some(from) = node.truncated_from {
            notes.push(format!("skipped {}..", from));
        }
        if node.missing > 0 {
            notes.push(format!("{} missing", node.missing));
        }
        if node.publish_failures + node.delete_failures > 0 {
            notes.push(format!(
                "{} publish / {} delete failures",
                node.publish_failures, node.delete_failures
            ));
        }

        table.add_row(vec![
            node.node.clone(),
            outcome.to_string(),
            window,
            node.identifiers.to_string(),
            node.published.to_string(),
            node.deleted.to_string(),
            opt(node.cursor),
            notes.join(", "),
        ]);
    }
    table
}
