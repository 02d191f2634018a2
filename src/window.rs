// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Cursor window arithmetic.
//!
//! A node's pending work is the half-open range `[next_to_process, last_seen + 1)`.
//! [`plan`] turns the two stored counters into that range, after two guards:
//!
//! 1. A cursor past `last_seen + 1` is corrupt (typically the producer's
//!    counter was reset). It is clamped to `last_seen + 1`, which yields an
//!    empty window; completing the node then rewrites a sane cursor.
//! 2. A range wider than the batch cap is cut down to the most recent
//!    `max_batch_size` sequence numbers. Older entries are skipped for good.

use core::ops::Range;

use serde::Serialize;

use crate::config::FIRST_SEQUENCE;

/// Per-node counters as read from the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Cursor {
    /// `ua-idx`, owned by the producer. Zero means nothing was ever logged.
    pub last_seen: u64,
    /// `ua-next`, owned by us.
    pub next_to_process: u64,
}

impl Cursor {
    /// Missing or zero `ua-next` starts from the first sequence number.
    pub fn from_stored(last_seen: Option<u64>, next_to_process: Option<u64>) -> Self {
        Self {
            last_seen: last_seen.unwrap_or(0),
            next_to_process: next_to_process.filter(|n| *n > 0).unwrap_or(FIRST_SEQUENCE),
        }
    }

    /// Cursor value to persist once everything up to `last_seen` is consumed.
    pub fn advanced(&self) -> u64 {
        self.last_seen.saturating_add(1)
    }

    pub fn is_corrupt(&self) -> bool {
        self.next_to_process > self.advanced()
    }
}

/// Half-open range of sequence numbers `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Window {
    pub start: u64,
    pub end: u64,
}

impl Window {
    pub fn empty_at(at: u64) -> Self {
        Self { start: at, end: at }
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sequences(&self) -> Range<u64> {
        self.start..self.end.max(self.start)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct WindowPlan {
    pub window: Window,
    /// Stored cursor, when it had to be clamped.
    pub clamped_from: Option<u64>,
    /// Untruncated start, when the backlog exceeded the batch cap.
    pub truncated_from: Option<u64>,
}

impl WindowPlan {
    /// Width of the backlog before truncation.
    pub fn backlog(&self) -> u64 {
        match self.truncated_from {
            Some(start) => self.window.end - start,
            None => self.window.len(),
        }
    }
}

pub fn plan(cursor: Cursor, max_batch_size: u64) -> WindowPlan {
    if cursor.last_seen == 0 {
        return WindowPlan {
            window: Window::empty_at(FIRST_SEQUENCE),
            clamped_from: None,
            truncated_from: None,
        };
    }

    let end = cursor.advanced();
    let mut start = cursor.next_to_process.max(FIRST_SEQUENCE);
    let mut clamped_from = None;
    let mut truncated_from = None;

    if start > end {
        clamped_from = Some(start);
        start = end;
    }

    let cap = max_batch_size.max(1);
    if end - start > cap {
        truncated_from = Some(start);
        start = end - cap;
    }

    WindowPlan {
        window: Window { start, end },
        clamped_from,
        truncated_from,
    }
}
