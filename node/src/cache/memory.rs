// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! In-process cache node.
//!
//! Used by tests and dry runs. Availability and delete failures can be toggled
//! to simulate an unreachable node or a partially failing one.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::cache::CacheNode;
use crate::errors::CacheError;

#[derive(Default)]
pub struct MemoryNode {
    name: String,
    entries: Mutex<BTreeMap<String, String>>,
    unavailable: AtomicBool,
    failing_deletes: AtomicBool,
}

impl MemoryNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Seeds a producer log: `ua-idx = identifiers.len()` and one `ua-<N>`
    /// per identifier starting at 1.
    pub fn with_log<I, S>(name: impl Into<String>, identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let node = Self::new(name);
        let mut last = 0u64;
        for (i, ua) in identifiers.into_iter().enumerate() {
            last = i as u64 + 1;
            node.insert(&format!("ua-{}", last), ua);
        }
        if last > 0 {
            node.insert("ua-idx", last.to_string());
        }
        node
    }

    pub fn insert(&self, key: &str, value: impl Into<String>) {
        self.lock().insert(key.to_string(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.lock().remove(key)
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    pub fn set_failing_deletes(&self, failing: bool) {
        self.failing_deletes.store(failing, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        // Poisoning is ignored.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(&self) -> Result<(), CacheError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(CacheError::Unavailable)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheNode for MemoryNode {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.check()?;
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.check()?;
        self.insert(key, value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        self.check()?;
        if self.failing_deletes.load(Ordering::SeqCst) {
            return Err(CacheError::Server("delete refused".into()));
        }
        Ok(self.remove(key).is_some())
    }
}
