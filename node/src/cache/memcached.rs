// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Minimal memcached text-protocol node.
//!
//! Speaks exactly `get`, `set` and `delete` over one lazily opened TCP
//! connection. The connection is dropped after any error or timeout and
//! reopened on the next call, so a failed operation never leaves half a reply
//! in the stream.

use std::net::{Ipv6Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::cache::CacheNode;
use crate::config::DEFAULT_MEMCACHED_PORT;
use crate::errors::CacheError;

const MAX_KEY_LEN: usize = 250;
/// memcached's default item size limit.
const MAX_VALUE_LEN: usize = 1024 * 1024;

/// Appends the default memcached port to a bare host.
pub fn normalize_addr(raw: &str) -> String {
    let raw = raw.trim();
    if raw.parse::<SocketAddr>().is_ok() {
        return raw.to_string();
    }
    if let Ok(v6) = raw.parse::<Ipv6Addr>() {
        return format!("[{}]:{}", v6, DEFAULT_MEMCACHED_PORT);
    }
    if raw.starts_with('[') && raw.ends_with(']') {
        return format!("{}:{}", raw, DEFAULT_MEMCACHED_PORT);
    }
    match raw.rsplit_once(':') {
        Some((_, port)) if port.parse::<u16>().is_ok() => raw.to_string(),
        _ => format!("{}:{}", raw, DEFAULT_MEMCACHED_PORT),
    }
}

pub struct MemcachedNode {
    addr: String,
    timeout: Duration,
    conn: Mutex<Option<BufStream<TcpStream>>>,
}

impl MemcachedNode {
    pub fn new(addr: &str, timeout: Duration) -> Self {
        Self {
            addr: normalize_addr(addr),
            timeout,
            conn: Mutex::new(None),
        }
    }

    async fn connect(&self) -> Result<BufStream<TcpStream>, CacheError> {
        let stream = timeout(self.timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| CacheError::Timeout {
                op: "connect",
                timeout: self.timeout,
            })?
            .map_err(|source| CacheError::Connect {
                addr: self.addr.clone(),
                source,
            })?;
        stream.set_nodelay(true)?;
        tracing::debug!("Connected to memcached at {}", self.addr);
        Ok(BufStream::new(stream))
    }

    async fn exchange(&self, op: &'static str, request: Vec<u8>) -> Result<Reply, CacheError> {
        let mut guard = self.conn.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect().await?);
        }
        let Some(conn) = guard.as_mut() else {
            return Err(CacheError::Unavailable);
        };

        let result = timeout(self.timeout, async {
            conn.write_all(&request).await?;
            conn.flush().await?;
            read_reply(conn, op).await
        })
        .await;

        match result {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(e)) => {
                *guard = None;
                Err(e)
            }
            Err(_) => {
                *guard = None;
                Err(CacheError::Timeout {
                    op,
                    timeout: self.timeout,
                })
            }
        }
    }
}

fn check_key(key: &str) -> Result<(), CacheError> {
    if key.is_empty() || key.len() > MAX_KEY_LEN || key.bytes().any(|b| b <= b' ' || b == 0x7f) {
        return Err(CacheError::Protocol(format!("invalid key {:?}", key)));
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Reply {
    Value(Option<Vec<u8>>),
    Stored,
    Deleted,
    NotFound,
}

async fn read_line(conn: &mut BufStream<TcpStream>) -> Result<String, CacheError> {
    let mut buf = Vec::new();
    let n = conn.read_until(b'\n', &mut buf).await?;
    if n == 0 {
        return Err(CacheError::Io(std::io::ErrorKind::UnexpectedEof.into()));
    }
    let line = String::from_utf8_lossy(&buf);
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn error_reply(line: &str) -> Option<CacheError> {
    if line == "ERROR" {
        return Some(CacheError::Protocol("server rejected command".into()));
    }
    if let Some(msg) = line.strip_prefix("CLIENT_ERROR ") {
        return Some(CacheError::Protocol(msg.to_string()));
    }
    line.strip_prefix("SERVER_ERROR ")
        .map(|msg| CacheError::Server(msg.to_string()))
}

async fn read_reply(conn: &mut BufStream<TcpStream>, op: &'static str) -> Result<Reply, CacheError> {
    let line = read_line(conn).await?;
    if let Some(e) = error_reply(&line) {
        return Err(e);
    }

    match op {
        "get" => {
            if line == "END" {
                return Ok(Reply::Value(None));
            }
            // VALUE <key> <flags> <bytes> [<cas unique>]
            let len = line
                .strip_prefix("VALUE ")
                .and_then(|rest| rest.split_whitespace().nth(2))
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| CacheError::Protocol(format!("unexpected get reply {:?}", line)))?;
            if len > MAX_VALUE_LEN {
                return Err(CacheError::Protocol(format!(
                    "value of {} bytes exceeds the {} byte item limit",
                    len, MAX_VALUE_LEN
                )));
            }

            let mut data = vec![0u8; len + 2];
            conn.read_exact(&mut data).await?;
            if !data.ends_with(b"\r\n") {
                return Err(CacheError::Protocol("value block not terminated".into()));
            }
            data.truncate(len);

            let end = read_line(conn).await?;
            if end != "END" {
                return Err(CacheError::Protocol(format!("expected END, got {:?}", end)));
            }
            Ok(Reply::Value(Some(data)))
        }
        "set" => match line.as_str() {
            "STORED" => Ok(Reply::Stored),
            other => Err(CacheError::Protocol(format!("unexpected set reply {:?}", other))),
        },
        _ => match line.as_str() {
            "DELETED" => Ok(Reply::Deleted),
            "NOT_FOUND" => Ok(Reply::NotFound),
            other => Err(CacheError::Protocol(format!("unexpected delete reply {:?}", other))),
        },
    }
}

#[async_trait]
impl CacheNode for MemcachedNode {
    fn name(&self) -> &str {
        &self.addr
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        check_key(key)?;
        match self.exchange("get", format!("get {}\r\n", key).into_bytes()).await? {
            Reply::Value(value) => Ok(value.map(|v| String::from_utf8_lossy(&v).into_owned())),
            other => Err(CacheError::Protocol(format!("unexpected reply {:?}", other))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        check_key(key)?;
        let mut request = format!("set {} 0 0 {}\r\n", key, value.len()).into_bytes();
        request.extend_from_slice(value.as_bytes());
        request.extend_from_slice(b"\r\n");
        self.exchange("set", request).await.map(|_| ())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        check_key(key)?;
        match self.exchange("delete", format!("delete {}\r\n", key).into_bytes()).await? {
            Reply::Deleted => Ok(true),
            _ => Ok(false),
        }
    }
}
