// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types.

use alloc::string::String;
use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    /// A counter stored in the cache (`ua-idx`, `ua-next`) is not a decimal integer.
    InvalidCounter(String),
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::InvalidCounter(raw) => write!(f, "invalid counter value: {:?}", raw),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for KernelError {}

pub type KernelResult<T> = core::result::Result<T, KernelError>;
