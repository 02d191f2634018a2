// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Per-node log drainer.
//!
//! One [`Drainer`] handles one cache node for one run:
//!
//! ```text
//! Idle -> WindowComputed -> Fetching -> Completed
//!   \__________________\________\____> Aborted   (node unreachable)
//! ```
//!
//! `collect` reads the cursor, plans the window and fetches every entry in it.
//! `complete` is only called once results are published; it deletes the
//! visited keys and persists the new cursor. Within a node these steps are
//! strictly ordered. An aborted node keeps its cursor untouched and is simply
//! retried on the next run.

use devicemap_kernel::keys::{entry_key, parse_counter, LAST_SEEN_KEY, NEXT_KEY};
use devicemap_kernel::window::{self, Cursor, WindowPlan};
use devicemap_kernel::LogEntry;
use serde::Serialize;

use crate::cache::{CacheNode, SharedNode};
use crate::errors::CacheError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainState {
    Idle,
    WindowComputed,
    Fetching,
    Completed,
    Aborted,
}

/// Counters as stored on one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoredCursor {
    /// `ua-idx`; `None` when absent, zero or unparseable.
    pub last_seen: Option<u64>,
    /// `ua-next` exactly as stored, when it parses.
    pub next_to_process: Option<u64>,
}

impl StoredCursor {
    pub fn cursor(&self) -> Option<Cursor> {
        self.last_seen
            .map(|last| Cursor::from_stored(Some(last), self.next_to_process))
    }
}

async fn read_counter(node: &dyn CacheNode, key: &str) -> Result<Option<u64>, CacheError> {
    let Some(raw) = node.get(key).await? else {
        return Ok(None);
    };
    match parse_counter(&raw) {
        Ok(v) => Ok(Some(v)),
        Err(e) => {
            tracing::warn!("{}: ignoring {}: {}", node.name(), key, e);
            Ok(None)
        }
    }
}

/// Reads `ua-idx` and `ua-next`. Any cache error means the node is unreachable.
pub async fn read_cursor(node: &dyn CacheNode) -> Result<StoredCursor, CacheError> {
    let last_seen = read_counter(node, LAST_SEEN_KEY).await?.filter(|v| *v > 0);
    if last_seen.is_none() {
        return Ok(StoredCursor {
            last_seen: None,
            next_to_process: None,
        });
    }
    let next_to_process = read_counter(node, NEXT_KEY).await?;
    Ok(StoredCursor {
        last_seen,
        next_to_process,
    })
}

/// Everything `collect` found on one node.
#[derive(Debug, Clone, Default)]
pub struct PendingBatch {
    pub stored: Option<StoredCursor>,
    pub plan: Option<WindowPlan>,
    /// Non-empty identifiers in sequence order, queued for classification.
    pub entries: Vec<LogEntry>,
    /// Every visited sequence number, queued for deletion.
    pub deletions: Vec<u64>,
    /// Sequence numbers with no stored value.
    pub missing: u64,
    /// Sequence numbers holding an empty string.
    pub blank: u64,
}

impl PendingBatch {
    pub fn scanned(&self) -> u64 {
        self.plan.map(|p| p.window.len()).unwrap_or(0)
    }

    /// Cursor to persist on completion, if the node has a log at all.
    pub fn next_cursor(&self) -> Option<u64> {
        self.stored.and_then(|s| s.cursor()).map(|c| c.advanced())
    }
}

/// Outcome of the completion pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub deleted: usize,
    pub already_gone: usize,
    pub delete_failures: usize,
    pub cursor: Option<u64>,
    pub cursor_advanced: bool,
    pub cursor_failed: bool,
}

pub struct Drainer {
    node: SharedNode,
    max_batch_size: u64,
    state: DrainState,
    pending: PendingBatch,
}

impl Drainer {
    pub fn new(node: SharedNode, max_batch_size: u64) -> Self {
        Self {
            node,
            max_batch_size,
            state: DrainState::Idle,
            pending: PendingBatch::default(),
        }
    }

    pub fn node(&self) -> &dyn CacheNode {
        self.node.as_ref()
    }

    pub fn name(&self) -> &str {
        self.node.name()
    }

    pub fn state(&self) -> DrainState {
        self.state
    }

    pub fn pending(&self) -> &PendingBatch {
        &self.pending
    }

    pub fn is_reachable(&self) -> bool {
        self.state != DrainState::Aborted
    }

    /// Idle -> Fetching (or straight to Completed when nothing was logged).
    pub async fn collect(&mut self) -> Result<(), CacheError> {
        if self.state != DrainState::Idle {
            return Ok(());
        }
        match self.try_collect().await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!("{}: node unreachable, skipping this run: {}", self.name(), e);
                metrics::increment_counter!("devicemap_nodes_aborted_total");
                self.state = DrainState::Aborted;
                self.pending = PendingBatch::default();
                Err(e)
            }
        }
    }

    async fn try_collect(&mut self) -> Result<(), CacheError> {
        let name = self.node.name().to_string();
        let stored = read_cursor(self.node.as_ref()).await?;
        self.pending.stored = Some(stored);

        let Some(cursor) = stored.cursor() else {
            tracing::debug!("{}: no missed User-Agents logged", name);
            self.state = DrainState::Completed;
            return Ok(());
        };

        let plan = window::plan(cursor, self.max_batch_size);
        if let Some(from) = plan.clamped_from {
            tracing::warn!(
                "{}: {} = {} is past {} = {}, clamping",
                name, NEXT_KEY, from, LAST_SEEN_KEY, cursor.last_seen
            );
        }
        if let Some(from) = plan.truncated_from {
            tracing::warn!(
                "{}: only considering the last {} entries: range {}..={} is too wide ({})",
                name,
                self.max_batch_size,
                from,
                cursor.last_seen,
                plan.backlog()
            );
        }
        self.pending.plan = Some(plan);
        self.state = DrainState::WindowComputed;

        if plan.window.is_empty() {
            tracing::debug!("{}: nothing new since {}", name, cursor.last_seen);
            self.state = DrainState::Fetching;
            return Ok(());
        }

        tracing::info!(
            "{}: downloading entries {} to {}",
            name,
            plan.window.start,
            plan.window.end - 1
        );
        self.state = DrainState::Fetching;

        for sequence in plan.window.sequences() {
            match self.node.get(&entry_key(sequence)).await? {
                Some(identifier) if !identifier.is_empty() => {
                    self.pending.entries.push(LogEntry {
                        sequence,
                        identifier,
                    });
                }
                Some(_) => self.pending.blank += 1,
                None => self.pending.missing += 1,
            }
            self.pending.deletions.push(sequence);
        }
        metrics::counter!("devicemap_entries_scanned_total", plan.window.len());

        tracing::debug!(
            "{}: {} entries, {} missing, {} blank",
            name,
            self.pending.entries.len(),
            self.pending.missing,
            self.pending.blank
        );
        Ok(())
    }

    /// Fetching -> Completed. Best effort: individual failures are counted and
    /// never stop the remaining deletes or the cursor write.
    pub async fn complete(&mut self) -> Completion {
        let mut done = Completion::default();
        if self.state != DrainState::Fetching {
            return done;
        }
        let name = self.node.name().to_string();

        if !self.pending.deletions.is_empty() {
            tracing::info!("{}: deleting {} keys", name, self.pending.deletions.len());
        }
        for sequence in &self.pending.deletions {
            let key = entry_key(*sequence);
            match self.node.delete(&key).await {
                Ok(true) => done.deleted += 1,
                Ok(false) => done.already_gone += 1,
                Err(e) => {
                    tracing::error!("{}: failed to delete {}: {}", name, key, e);
                    done.delete_failures += 1;
                }
            }
        }
        metrics::counter!("devicemap_keys_deleted_total", done.deleted as u64);

        if let Some(next) = self.pending.next_cursor() {
            done.cursor = Some(next);
            let stored = self.pending.stored.and_then(|s| s.next_to_process);
            if stored != Some(next) {
                tracing::info!("{}: updating {} to {}", name, NEXT_KEY, next);
                match self.node.set(NEXT_KEY, &next.to_string()).await {
                    Ok(()) => done.cursor_advanced = true,
                    Err(e) => {
                        tracing::error!("{}: failed to update {}: {}", name, NEXT_KEY, e);
                        done.cursor_failed = true;
                    }
                }
            }
        }

        self.state = DrainState::Completed;
        done
    }
}
