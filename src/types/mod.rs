// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Domain types shared by the kernel and the node runtime.

pub mod device;
pub mod id;
pub mod properties;
