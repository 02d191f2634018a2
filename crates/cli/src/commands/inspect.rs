// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Read-only view of each node's log cursor.

use std::time::Duration;

use comfy_table::Table;
use devicemap_kernel::window;
use devicemap_node::cache::{CacheNode, SharedNode};
use devicemap_node::drain::read_cursor;
use futures::future::join_all;
use serde::Serialize;

use super::{connect, opt, table};
use crate::args::InspectArgs;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeStatus {
    pub node: String,
    pub reachable: bool,
    pub error: Option<String>,
    pub last_seen: Option<u64>,
    pub next_to_process: Option<u64>,
    /// Entries the next run would visit.
    pub pending: u64,
    /// Entries behind the cursor that exceed the batch cap.
    pub backlog: u64,
    pub corrupt: bool,
    pub truncated: bool,
}

impl NodeStatus {
    fn unreachable(node: &str, error: String) -> Self {
        Self {
            node: node.to_string(),
            reachable: false,
            error: Some(error),
            last_seen: None,
            next_to_process: None,
            pending: 0,
            backlog: 0,
            corrupt: false,
            truncated: false,
        }
    }
}

async fn status(node: &dyn CacheNode, max_batch_size: u64) -> NodeStatus {
    let stored = match read_cursor(node).await {
        Ok(stored) => stored,
        Err(e) => return NodeStatus::unreachable(node.name(), e.to_string()),
    };
    let mut status = NodeStatus {
        node: node.name().to_string(),
        reachable: true,
        error: None,
        last_seen: stored.last_seen,
        next_to_process: stored.next_to_process,
        pending: 0,
        backlog: 0,
        corrupt: false,
        truncated: false,
    };
    if let Some(cursor) = stored.cursor() {
        let plan = window::plan(cursor, max_batch_size.max(1));
        status.pending = plan.window.len();
        status.backlog = plan.backlog() - plan.window.len();
        status.corrupt = cursor.is_corrupt();
        status.truncated = plan.truncated_from.is_some();
    }
    status
}

pub async fn collect_rows(nodes: &[SharedNode], max_batch_size: u64) -> Vec<NodeStatus> {
    join_all(nodes.iter().map(|n| status(n.as_ref(), max_batch_size))).await
}

pub fn render(rows: &[NodeStatus]) -> Table {
    let mut table = table(vec!["Node", "Status", "ua-idx", "ua-next", "Pending", "Details"]);
    for row in rows {
        let status = if !row.reachable {
            "UNREACHABLE"
        } else if row.last_seen.is_none() {
            "EMPTY"
        } else if row.corrupt {
            "CORRUPT"
        } else {
            "OK"
        };
        let details = if let Some(e) = &row.error {
            e.clone()
        } else if row.truncated {
            format!("{} entries over the batch cap will be skipped", row.backlog)
        } else {
            String::new()
        };
        table.add_row(vec![
            row.node.clone(),
            status.to_string(),
            opt(row.last_seen),
            opt(row.next_to_process),
            row.pending.to_string(),
            details,
        ]);
    }
    table
}

pub async fn run(args: &InspectArgs) -> anyhow::Result<()> {
    let nodes = connect(&args.nodes, Duration::from_millis(args.node_timeout_ms));
    let rows = collect_rows(&nodes, args.max_batch_size).await;
    println!("{}", render(&rows));
    Ok(())
}
