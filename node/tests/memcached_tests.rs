// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::*;
use devicemap_kernel::IdentifierKey;
use devicemap_node::cache::{CacheNode, MemcachedNode, SharedNode};
use devicemap_node::errors::CacheError;
use devicemap_node::report::NodeOutcome;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufStream};
use tokio::net::{TcpListener, TcpStream};

type Store = Arc<Mutex<HashMap<String, Vec<u8>>>>;

/// Just enough of the memcached text protocol to exercise the client.
async fn spawn_memcached() -> (String, Store) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let store: Store = Arc::default();
    let shared = store.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(serve(socket, shared.clone()));
        }
    });
    (addr, store)
}

async fn serve(socket: TcpStream, store: Store) {
    let mut stream = BufStream::new(socket);
    let mut line = String::new();
    loop {
        line.clear();
        match stream.read_line(&mut line).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let parts: Vec<String> = line.split_whitespace().map(String::from).collect();
        let reply: Vec<u8> = match parts.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
            ["get", key] => {
                let value = store.lock().unwrap().get(*key).cloned();
                match value {
                    Some(v) => {
                        let mut out = format!("VALUE {} 0 {}\r\n", key, v.len()).into_bytes();
                        out.extend_from_slice(&v);
                        out.extend_from_slice(b"\r\nEND\r\n");
                        out
                    }
                    None => b"END\r\n".to_vec(),
                }
            }
            ["set", key, _flags, _exptime, len] => {
                let len: usize = len.parse().unwrap();
                let mut data = vec![0u8; len + 2];
                if stream.read_exact(&mut data).await.is_err() {
                    return;
                }
                data.truncate(len);
                store.lock().unwrap().insert(key.to_string(), data);
                b"STORED\r\n".to_vec()
            }
            ["delete", key] => {
                let removed = store.lock().unwrap().remove(*key).is_some();
                if removed {
                    b"DELETED\r\n".to_vec()
                } else {
                    b"NOT_FOUND\r\n".to_vec()
                }
            }
            _ => b"ERROR\r\n".to_vec(),
        };
        if stream.write_all(&reply).await.is_err() || stream.flush().await.is_err() {
            return;
        }
    }
}

fn seed(store: &Store, entries: &[(&str, &str)]) {
    let mut map = store.lock().unwrap();
    for (k, v) in entries {
        map.insert(k.to_string(), v.as_bytes().to_vec());
    }
}

fn read(store: &Store, key: &str) -> Option<String> {
    store
        .lock()
        .unwrap()
        .get(key)
        .map(|v| String::from_utf8_lossy(v).into_owned())
}

#[tokio::test]
async fn test_get_set_delete() {
    let (addr, _) = spawn_memcached().await;
    let node = MemcachedNode::new(&addr, Duration::from_secs(1));
    assert_eq!(node.name(), addr);

    assert_eq!(node.get("ua-idx").await.unwrap(), None);
    node.set("ua-next", "42").await.unwrap();
    assert_eq!(node.get("ua-next").await.unwrap().as_deref(), Some("42"));

    // Values carry spaces, CRLF-free punctuation and non-ASCII text.
    let ua = "Mozilla/5.0 (Linux; Android 4.4; Nexus 5 Build/KRT16M) Größe";
    node.set("ua-1", ua).await.unwrap();
    assert_eq!(node.get("ua-1").await.unwrap().as_deref(), Some(ua));

    assert!(node.delete("ua-1").await.unwrap());
    assert!(!node.delete("ua-1").await.unwrap());
    assert_eq!(node.get("ua-1").await.unwrap(), None);
}

#[tokio::test]
async fn test_invalid_key_is_rejected_locally() {
    let (addr, _) = spawn_memcached().await;
    let node = MemcachedNode::new(&addr, Duration::from_secs(1));
    let err = node.get("ua 1").await.unwrap_err();
    assert!(matches!(err, CacheError::Protocol(_)), "{:?}", err);
    // The connection is still usable.
    node.set("ua-idx", "1").await.unwrap();
}

#[tokio::test]
async fn test_unreachable_node() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let node = MemcachedNode::new(&addr, Duration::from_millis(500));
    let err = node.get("ua-idx").await.unwrap_err();
    assert!(
        matches!(err, CacheError::Connect { .. } | CacheError::Timeout { .. }),
        "{:?}",
        err
    );
}

#[tokio::test]
async fn test_silent_server_times_out() {
    // Accepts connections but never answers.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let node = MemcachedNode::new(&addr, Duration::from_millis(200));
    let err = node.get("ua-idx").await.unwrap_err();
    assert!(matches!(err, CacheError::Timeout { op: "get", .. }), "{:?}", err);
}

/// Answers every command with a `VALUE` header announcing `len` bytes.
async fn spawn_lying_server(len: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut stream = BufStream::new(socket);
                let mut line = String::new();
                while matches!(stream.read_line(&mut line).await, Ok(n) if n > 0) {
                    line.clear();
                    let header = format!("VALUE ua-idx 0 {}\r\n", len);
                    if stream.write_all(header.as_bytes()).await.is_err() || stream.flush().await.is_err() {
                        return;
                    }
                }
            });
        }
    });
    addr
}

#[tokio::test]
async fn test_oversized_value_length_is_a_protocol_error() {
    for len in ["18446744073709551615", "2097152"] {
        let addr = spawn_lying_server(len).await;
        let node = MemcachedNode::new(&addr, Duration::from_secs(1));
        let err = node.get("ua-idx").await.unwrap_err();
        assert!(matches!(err, CacheError::Protocol(_)), "len={} {:?}", len, err);
    }
}

#[tokio::test]
async fn test_run_aborts_node_announcing_oversized_value() {
    let (addr_a, store_a) = spawn_memcached().await;
    seed(&store_a, &[("ua-idx", "1"), ("ua-1", IPHONE)]);
    let bad = spawn_lying_server("18446744073709551615").await;

    let nodes: Vec<SharedNode> = vec![
        Arc::new(MemcachedNode::new(&addr_a, Duration::from_secs(1))),
        Arc::new(MemcachedNode::new(&bad, Duration::from_secs(1))),
    ];
    let lookup = Arc::new(StubLookup::new());
    let report = reconciler(&lookup, &config()).run_once(&nodes).await;

    assert_eq!(report.nodes[0].outcome, NodeOutcome::Completed);
    assert_eq!(report.nodes[1].outcome, NodeOutcome::Aborted);
    assert_eq!(lookup.calls(), 1);
    assert_eq!(read(&store_a, "ua-next").as_deref(), Some("2"));
}

#[tokio::test]
async fn test_run_over_memcached_nodes() {
    let (addr_a, store_a) = spawn_memcached().await;
    let (addr_b, store_b) = spawn_memcached().await;
    seed(&store_a, &[("ua-idx", "2"), ("ua-1", IPHONE), ("ua-2", NOKIA)]);
    seed(&store_b, &[("ua-idx", "7"), ("ua-next", "6"), ("ua-6", IPAD), ("ua-7", IPHONE)]);

    let nodes: Vec<SharedNode> = vec![
        Arc::new(MemcachedNode::new(&addr_a, Duration::from_secs(1))),
        Arc::new(MemcachedNode::new(&addr_b, Duration::from_secs(1))),
    ];
    let lookup = Arc::new(StubLookup::new());
    let report = reconciler(&lookup, &config()).run_once(&nodes).await;

    assert_eq!(lookup.calls(), 3);
    assert_eq!(report.reachable_nodes(), 2);

    let iphone = IdentifierKey::of(IPHONE).cache_key();
    for store in [&store_a, &store_b] {
        assert_eq!(read(store, &iphone).as_deref(), Some("touch"));
        assert_eq!(read(store, &IdentifierKey::of(IPAD).cache_key()).as_deref(), Some("tablet"));
        assert_eq!(read(store, &IdentifierKey::of(NOKIA).cache_key()).as_deref(), Some("mobile"));
    }
    assert_eq!(read(&store_a, "ua-next").as_deref(), Some("3"));
    assert_eq!(read(&store_b, "ua-next").as_deref(), Some("8"));
    assert_eq!(read(&store_a, "ua-1"), None);
    assert_eq!(read(&store_b, "ua-6"), None);
    assert_eq!(read(&store_b, "ua-7"), None);
}

#[tokio::test]
async fn test_run_with_one_node_down() {
    let (addr_a, store_a) = spawn_memcached().await;
    seed(&store_a, &[("ua-idx", "1"), ("ua-1", DESKTOP)]);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = listener.local_addr().unwrap().to_string();
    drop(listener);

    let nodes: Vec<SharedNode> = vec![
        Arc::new(MemcachedNode::new(&addr_a, Duration::from_millis(500))),
        Arc::new(MemcachedNode::new(&dead, Duration::from_millis(500))),
    ];
    let lookup = Arc::new(StubLookup::new());
    let report = reconciler(&lookup, &config()).run_once(&nodes).await;

    assert_eq!(report.aborted_nodes().count(), 1);
    assert_eq!(report.nodes[1].node, dead);
    assert_eq!(read(&store_a, "ua-next").as_deref(), Some("2"));
    assert_eq!(
        read(&store_a, &IdentifierKey::of(DESKTOP).cache_key()).as_deref(),
        Some("desktop")
    );
}
