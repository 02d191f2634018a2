// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Identity types.

use alloc::format;
use alloc::string::String;
use core::fmt;

use serde::Serialize;

use crate::keys::KEY_PREFIX;

/// Content hash of an identifier string: lowercase hex MD5.
///
/// The edge proxy looks results up as `ua-<md5(User-Agent)>`, so the digest
/// must stay MD5 for the published keys to be found.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct IdentifierKey(String);

impl IdentifierKey {
    pub fn of(identifier: &str) -> Self {
        IdentifierKey(format!("{:x}", md5::compute(identifier.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Cache key the classification result is published under.
    pub fn cache_key(&self) -> String {
        format!("{}{}", KEY_PREFIX, self.0)
    }
}

impl fmt::Display for IdentifierKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One observation read from `ua-<sequence>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    pub sequence: u64,
    pub identifier: String,
}

impl LogEntry {
    pub fn key(&self) -> IdentifierKey {
        IdentifierKey::of(&self.identifier)
    }
}
