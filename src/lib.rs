// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
#![no_std]

//! devicemap-kernel: pure, I/O-free core of the unknown User-Agent resolver.
//!
//! Everything in here is deterministic: device-type taxonomy, the property bag
//! returned by the classification service, the ordered rule chain that maps one
//! onto the other, cursor window arithmetic and cache key naming. Network and
//! cache access live in `devicemap-node`.

extern crate alloc;

#[cfg(test)]
#[macro_use]
extern crate std;

#[cfg(all(feature = "std", not(test)))]
extern crate std;

pub mod config;
pub mod error;
pub mod types;
pub mod keys;
pub mod classify;
pub mod window;

pub use classify::{Matcher, Rule, RuleSet};
pub use error::{KernelError, KernelResult};
pub use types::device::DeviceType;
pub use types::id::{IdentifierKey, LogEntry};
pub use types::properties::{Flag, PropertyBag};
pub use window::{Cursor, Window, WindowPlan};

#[cfg(test)]
pub mod tests;
