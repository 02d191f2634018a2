// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Cache nodes the resolver drains and publishes to.
//!
//! Each node is an independent key/value store. Nothing is transactional
//! across nodes, and the resolver only ever needs `get`, `set` and `delete`.

pub mod memcached;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::CacheError;

pub use memcached::MemcachedNode;
pub use memory::MemoryNode;

#[async_trait]
pub trait CacheNode: Send + Sync {
    /// Name used in logs and reports, usually `host:port`.
    fn name(&self) -> &str;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;

    /// Returns `false` when the key did not exist.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;
}

pub type SharedNode = Arc<dyn CacheNode>;
