// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::fmt;
use std::time::Duration;

use devicemap_kernel::config::DEFAULT_MAX_BATCH_SIZE;

use crate::errors::ConfigError;

pub const DEFAULT_ENDPOINT: &str = "https://region2.deviceatlascloud.com";
pub const DEFAULT_MEMCACHED_PORT: u16 = 11211;
pub const DEFAULT_USER_AGENT: &str = concat!("devicemap/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct ResolverConfig {
    /// Scheme and host of the classification service, without a trailing path.
    pub endpoint: String,
    pub licence_key: String,
    /// Budget for one classification call, connect to last body byte.
    pub request_timeout: Duration,
    pub user_agent: String,
    pub max_batch_size: u64,
    pub max_concurrent_lookups: usize,
    /// Budget for connecting to a cache node and for each cache operation.
    pub node_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            licence_key: String::new(),
            request_timeout: Duration::from_secs(2),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_concurrent_lookups: 8,
            node_timeout: Duration::from_secs(1),
        }
    }
}

impl ResolverConfig {
    pub fn with_licence_key(licence_key: impl Into<String>) -> Self {
        Self {
            licence_key: licence_key.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.licence_key.trim().is_empty() {
            return Err(ConfigError::Invalid("licence key must not be empty".into()));
        }
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "endpoint must be an http(s) URL, got {:?}",
                self.endpoint
            )));
        }
        if self.max_batch_size == 0 {
            return Err(ConfigError::Invalid("max batch size must be at least 1".into()));
        }
        if self.max_concurrent_lookups == 0 {
            return Err(ConfigError::Invalid("lookup concurrency must be at least 1".into()));
        }
        if self.request_timeout.is_zero() || self.node_timeout.is_zero() {
            return Err(ConfigError::Invalid("timeouts must be non-zero".into()));
        }
        Ok(())
    }
}

// Keeps the licence key out of logs.
impl fmt::Debug for ResolverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverConfig")
            .field("endpoint", &self.endpoint)
            .field("licence_key", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .field("user_agent", &self.user_agent)
            .field("max_batch_size", &self.max_batch_size)
            .field("max_concurrent_lookups", &self.max_concurrent_lookups)
            .field("node_timeout", &self.node_timeout)
            .finish()
    }
}
