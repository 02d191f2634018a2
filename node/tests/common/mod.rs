// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use devicemap_kernel::{Flag, PropertyBag};
use devicemap_node::cache::{MemoryNode, SharedNode};
use devicemap_node::config::ResolverConfig;
use devicemap_node::errors::LookupError;
use devicemap_node::network::DeviceLookup;
use devicemap_node::reconcile::Reconciler;

pub const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 7_0 like Mac OS X) AppleWebKit/537.51.1 (KHTML, like Gecko) Version/7.0 Mobile/11A465 Safari/9537.53";
pub const IPAD: &str = "Mozilla/5.0 (iPad; CPU OS 7_0 like Mac OS X) AppleWebKit/537.51.1 (KHTML, like Gecko) Version/7.0 Mobile/11A465 Safari/9537.53";
pub const NOKIA: &str = "Nokia6300/2.0 (05.00) Profile/MIDP-2.0 Configuration/CLDC-1.1";
pub const DESKTOP: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:27.0) Gecko/20100101 Firefox/27.0";
pub const GOOGLEBOT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 6_0 like Mac OS X) (compatible; Googlebot-Mobile/2.1; +http://www.google.com/bot.html)";

/// Deterministic stand-in for the classification service.
#[derive(Default)]
pub struct StubLookup {
    pub calls: AtomicUsize,
    pub seen: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    failing: Vec<String>,
    delay: Option<Duration>,
}

impl StubLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(identifiers: &[&str]) -> Self {
        Self {
            failing: identifiers.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, identifier: &str) -> usize {
        self.seen.lock().unwrap().iter().filter(|s| *s == identifier).count()
    }
}

pub fn properties_for(identifier: &str) -> PropertyBag {
    let mut props = PropertyBag::default();
    if identifier.contains("Googlebot") {
        return props.with(Flag::MobileDevice).with(Flag::IsRobot);
    }
    if identifier.contains("iPad") {
        props = props.with(Flag::MobileDevice).with(Flag::TouchScreen).with(Flag::IsTablet);
    } else if identifier.contains("iPhone") {
        props = props.with(Flag::MobileDevice).with(Flag::TouchScreen);
    } else if identifier.contains("Nokia") || identifier.contains("Phone") || identifier.contains("Tablet") {
        props = props.with(Flag::MobileDevice);
    }
    props
}

#[async_trait]
impl DeviceLookup for StubLookup {
    async fn lookup(&self, identifier: &str) -> Result<PropertyBag, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(identifier.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.iter().any(|f| f == identifier) {
            return Err(LookupError::Status(500));
        }
        Ok(properties_for(identifier))
    }
}

pub fn config() -> ResolverConfig {
    ResolverConfig::with_licence_key("test-licence")
}

pub fn reconciler(lookup: &Arc<StubLookup>, cfg: &ResolverConfig) -> Reconciler {
    Reconciler::new(lookup.clone(), cfg)
}

pub fn shared(nodes: &[&Arc<MemoryNode>]) -> Vec<SharedNode> {
    nodes.iter().map(|n| (*n).clone() as SharedNode).collect()
}

/// Snapshot of every key on a node, for before/after comparisons.
pub fn dump(node: &MemoryNode) -> HashMap<String, String> {
    node.keys()
        .into_iter()
        .filter_map(|k| node.value(&k).map(|v| (k, v)))
        .collect()
}
