// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Configuration constants.

/// Maximum number of log entries scanned per node and per run.
pub const DEFAULT_MAX_BATCH_SIZE: u64 = 1000;

/// First sequence number the producer ever writes.
pub const FIRST_SEQUENCE: u64 = 1;
