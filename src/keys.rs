// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Cache key layout shared with the edge proxy.
//!
//! | key           | owner    | value                                 |
//! |---------------|----------|---------------------------------------|
//! | `ua-idx`      | producer | highest sequence number written       |
//! | `ua-next`     | resolver | next sequence number to process       |
//! | `ua-<N>`      | producer | raw User-Agent logged at sequence `N` |
//! | `ua-<md5>`    | resolver | device type label                     |

use alloc::format;
use alloc::string::{String, ToString};

use crate::error::{KernelError, KernelResult};

pub const KEY_PREFIX: &str = "ua-";
pub const LAST_SEEN_KEY: &str = "ua-idx";
pub const NEXT_KEY: &str = "ua-next";

pub fn entry_key(sequence: u64) -> String {
    format!("{}{}", KEY_PREFIX, sequence)
}

/// Parses a counter as stored by memcached `incr` or by us.
pub fn parse_counter(raw: &str) -> KernelResult<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| KernelError::InvalidCounter(raw.to_string()))
}
