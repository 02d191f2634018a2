// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod inspect;
pub mod lookup;
pub mod resolve;

use std::sync::Arc;
use std::time::Duration;

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use devicemap_node::cache::{MemcachedNode, SharedNode};

pub(crate) fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub(crate) fn connect(addrs: &[String], timeout: Duration) -> Vec<SharedNode> {
    addrs
        .iter()
        .map(|addr| Arc::new(MemcachedNode::new(addr, timeout)) as SharedNode)
        .collect()
}

pub(crate) fn opt(v: Option<u64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}
