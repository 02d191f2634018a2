// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Device-type taxonomy published to the edge proxy.

use core::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum DeviceType {
    Desktop = 0,
    Mobile = 1,
    Touch = 2,
    Tablet = 3,
}

impl DeviceType {
    pub const ALL: [DeviceType; 4] = [
        DeviceType::Desktop,
        DeviceType::Mobile,
        DeviceType::Touch,
        DeviceType::Tablet,
    ];

    /// Label written to the cache as the value of `ua-<hash>`.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Desktop => "desktop",
            DeviceType::Mobile => "mobile",
            DeviceType::Touch => "touch",
            DeviceType::Tablet => "tablet",
        }
    }
}

impl Default for DeviceType {
    fn default() -> Self {
        DeviceType::Desktop
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
