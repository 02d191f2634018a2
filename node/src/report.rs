// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Run report. Purely observational: nothing in the pipeline branches on it.

use devicemap_kernel::window::Window;
use devicemap_kernel::{DeviceType, IdentifierKey};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeOutcome {
    /// Drained, published and completed.
    Completed,
    /// No `ua-idx` on the node; results were still published.
    NothingLogged,
    /// Unreachable; excluded from the run with its cursor untouched.
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeReport {
    pub node: String,
    pub outcome: NodeOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<Window>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clamped_from: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncated_from: Option<u64>,
    pub scanned: u64,
    pub identifiers: usize,
    pub missing: u64,
    pub published: usize,
    pub publish_failures: usize,
    pub deleted: usize,
    pub delete_failures: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<u64>,
    pub cursor_advanced: bool,
}

impl NodeReport {
    pub fn aborted(node: &str, error: String) -> Self {
        Self {
            node: node.to_string(),
            outcome: NodeOutcome::Aborted,
            error: Some(error),
            window: None,
            clamped_from: None,
            truncated_from: None,
            scanned: 0,
            identifiers: 0,
            missing: 0,
            published: 0,
            publish_failures: 0,
            deleted: 0,
            delete_failures: 0,
            cursor: None,
            cursor_advanced: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub key: IdentifierKey,
    pub identifier: String,
    pub device_type: DeviceType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedLookup {
    pub key: IdentifierKey,
    pub identifier: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub nodes: Vec<NodeReport>,
    /// Sequence numbers visited, summed over nodes.
    pub entries_scanned: u64,
    /// Non-empty identifiers read, summed over nodes, before de-duplication.
    pub identifiers_found: usize,
    pub unique_identifiers: usize,
    pub resolved: Vec<Resolution>,
    pub failed: Vec<FailedLookup>,
}

impl RunReport {
    pub fn aborted_nodes(&self) -> impl Iterator<Item = &NodeReport> {
        self.nodes.iter().filter(|n| n.outcome == NodeOutcome::Aborted)
    }

    pub fn reachable_nodes(&self) -> usize {
        self.nodes.len() - self.aborted_nodes().count()
    }

    pub fn keys_deleted(&self) -> usize {
        self.nodes.iter().map(|n| n.deleted).sum()
    }
}
