// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Reconciliation run across all cache nodes.
//!
//! One run:
//! 1. drain every node (unreachable nodes are dropped from the run);
//! 2. merge identifiers from all nodes by content hash, first seen wins;
//! 3. look every unique identifier up once, on a bounded pool;
//! 4. classify each successful lookup;
//! 5. publish the full result map to every reachable node;
//! 6. complete every reachable node (delete consumed keys, advance cursor);
//! 7. report.
//!
//! Only node reachability decides whether a node takes part. Lookup failures,
//! publish failures and delete failures are logged and counted, never fatal.
//! Callers must not start two runs against the same nodes at once.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use devicemap_kernel::{DeviceType, IdentifierKey, RuleSet};
use futures::future::join_all;
use futures::stream::{self, StreamExt};

use crate::cache::{CacheNode, SharedNode};
use crate::config::ResolverConfig;
use crate::drain::{Completion, DrainState, Drainer};
use crate::network::DeviceLookup;
use crate::report::{FailedLookup, NodeOutcome, NodeReport, Resolution, RunReport};

pub struct Reconciler {
    lookup: Arc<dyn DeviceLookup>,
    rules: RuleSet,
    max_batch_size: u64,
    max_concurrent_lookups: usize,
}

#[derive(Debug, Default, Clone, Copy)]
struct Published {
    written: usize,
    failed: usize,
}

impl Reconciler {
    pub fn new(lookup: Arc<dyn DeviceLookup>, cfg: &ResolverConfig) -> Self {
        Self {
            lookup,
            rules: RuleSet::default(),
            max_batch_size: cfg.max_batch_size,
            max_concurrent_lookups: cfg.max_concurrent_lookups.max(1),
        }
    }

    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub async fn run_once(&self, nodes: &[SharedNode]) -> RunReport {
        let started = Instant::now();

        // 1. Drain.
        let mut drainers: Vec<Drainer> = nodes
            .iter()
            .map(|node| Drainer::new(node.clone(), self.max_batch_size))
            .collect();
        let collected = join_all(drainers.iter_mut().map(|d| d.collect())).await;
        let errors: Vec<Option<String>> = collected
            .into_iter()
            .map(|r| r.err().map(|e| e.to_string()))
            .collect();

        // 2. Merge.
        let mut unique: BTreeMap<IdentifierKey, String> = BTreeMap::new();
        let mut identifiers_found = 0;
        for drainer in drainers.iter().filter(|d| d.is_reachable()) {
            for entry in &drainer.pending().entries {
                identifiers_found += 1;
                unique
                    .entry(entry.key())
                    .or_insert_with(|| entry.identifier.clone());
            }
        }
        let unique_identifiers = unique.len();

        // 3-4. Resolve and classify.
        tracing::info!("Resolving {} previously unknown User-Agent strings", unique_identifiers);
        let (results, resolved, failed) = self.resolve(unique).await;

        // 5-6. Publish, then complete, per node.
        let results = &results;
        let finished = join_all(
            drainers
                .iter_mut()
                .filter(|d| d.is_reachable())
                .map(|d| async move {
                    let published = publish(d.node(), results).await;
                    let completion = d.complete().await;
                    (published, completion)
                }),
        )
        .await;

        // 7. Report.
        let mut finished = finished.into_iter();
        let mut report = RunReport {
            identifiers_found,
            unique_identifiers,
            resolved,
            failed,
            ..Default::default()
        };
        for (drainer, error) in drainers.iter().zip(errors) {
            if !drainer.is_reachable() {
                let reason = error.unwrap_or_else(|| "unreachable".to_string());
                report.nodes.push(NodeReport::aborted(drainer.name(), reason));
                continue;
            }
            let (published, completion) = finished.next().unwrap_or_default();
            let node = node_report(drainer, published, completion);
            report.entries_scanned += node.scanned;
            report.nodes.push(node);
        }

        let elapsed = started.elapsed();
        metrics::histogram!("devicemap_run_duration_seconds", elapsed.as_secs_f64());
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        metrics::gauge!("devicemap_last_run_timestamp_seconds", now);

        tracing::info!(
            "Run finished in {:?}: {} nodes ({} unreachable), {} scanned, {} resolved, {} failed",
            elapsed,
            report.nodes.len(),
            report.aborted_nodes().count(),
            report.entries_scanned,
            report.resolved.len(),
            report.failed.len()
        );
        report
    }

    async fn resolve(
        &self,
        unique: BTreeMap<IdentifierKey, String>,
    ) -> (BTreeMap<IdentifierKey, DeviceType>, Vec<Resolution>, Vec<FailedLookup>) {
        let lookup = self.lookup.as_ref();
        let outcomes: Vec<_> = stream::iter(unique)
            .map(|(key, identifier)| async move {
                let outcome = lookup.lookup(&identifier).await;
                (key, identifier, outcome)
            })
            .buffer_unordered(self.max_concurrent_lookups)
            .collect()
            .await;

        let mut results = BTreeMap::new();
        let mut resolved = Vec::new();
        let mut failed = Vec::new();
        for (key, identifier, outcome) in outcomes {
            match outcome {
                Ok(props) => {
                    let device_type = self.rules.classify(&props, &identifier);
                    tracing::debug!("[{}] {} -> {}", key, identifier, device_type);
                    metrics::increment_counter!("devicemap_lookups_total", "outcome" => "ok");
                    results.insert(key.clone(), device_type);
                    resolved.push(Resolution {
                        key,
                        identifier,
                        device_type,
                    });
                }
                Err(e) => {
                    tracing::warn!("Failed to resolve key {} with string {:?}: {}", key, identifier, e);
                    metrics::increment_counter!("devicemap_lookups_total", "outcome" => e.code());
                    failed.push(FailedLookup {
                        key,
                        identifier,
                        error: e.to_string(),
                    });
                }
            }
        }

        // buffer_unordered yields in completion order.
        resolved.sort_by(|a, b| a.key.cmp(&b.key));
        failed.sort_by(|a, b| a.key.cmp(&b.key));
        (results, resolved, failed)
    }
}

/// Writes every `ua-<hash>` result to one node, whether or not that node
/// observed the identifier.
async fn publish(node: &dyn CacheNode, results: &BTreeMap<IdentifierKey, DeviceType>) -> Published {
    let mut published = Published::default();
    for (key, device_type) in results {
        let cache_key = key.cache_key();
        match node.set(&cache_key, device_type.as_str()).await {
            Ok(()) => published.written += 1,
            Err(e) => {
                tracing::error!("{}: failed to publish {}: {}", node.name(), cache_key, e);
                published.failed += 1;
            }
        }
    }
    if published.written > 0 {
        tracing::info!("{}: published {} results", node.name(), published.written);
    }
    metrics::counter!("devicemap_results_published_total", published.written as u64);
    published
}

fn node_report(drainer: &Drainer, published: Published, completion: Completion) -> NodeReport {
    let pending = drainer.pending();
    let plan = pending.plan;
    let outcome = if plan.is_some() {
        NodeOutcome::Completed
    } else {
        NodeOutcome::NothingLogged
    };
    debug_assert!(drainer.state() == DrainState::Completed);

    NodeReport {
        node: drainer.name().to_string(),
        outcome,
        error: None,
        window: plan.map(|p| p.window),
        clamped_from: plan.and_then(|p| p.clamped_from),
        truncated_from: plan.and_then(|p| p.truncated_from),
        scanned: pending.scanned(),
        identifiers: pending.entries.len(),
        missing: pending.missing,
        published: published.written,
        publish_failures: published.failed,
        deleted: completion.deleted,
        delete_failures: completion.delete_failures,
        cursor: completion.cursor,
        cursor_advanced: completion.cursor_advanced,
    }
}
