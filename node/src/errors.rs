// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::time::Duration;

use thiserror::Error;

/// Failure of one classification call. Never fatal to a run.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("lookup timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("service answered with HTTP {0}")]
    Status(u16),
    #[error("unparseable response body: {0}")]
    Decode(String),
}

impl LookupError {
    /// Short stable label for logs and metrics.
    pub fn code(&self) -> &'static str {
        match self {
            LookupError::Timeout(_) => "timeout",
            LookupError::Transport(_) => "transport",
            LookupError::Status(_) => "status",
            LookupError::Decode(_) => "decode",
        }
    }
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{op} timed out after {timeout:?}")]
    Timeout { op: &'static str, timeout: Duration },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("server error: {0}")]
    Server(String),
    #[error("node unavailable")]
    Unavailable,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}
