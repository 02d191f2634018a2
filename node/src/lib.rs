// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod config;
pub mod errors;
pub mod telemetry;
pub mod network;
pub mod cache;
pub mod drain;
pub mod reconcile;
pub mod report;
