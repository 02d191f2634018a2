// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Property bag returned by the classification service.
//!
//! The service sends an open-ended JSON object. Only the four flags the rule
//! chain looks at are modelled; anything else is ignored. A flag that is
//! absent or `null` reads as `false`.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyBag {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_device: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub touch_screen: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_tablet: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_robot: Option<bool>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Flag {
    MobileDevice,
    TouchScreen,
    IsTablet,
    IsRobot,
}

impl Flag {
    pub const ALL: [Flag; 4] = [Flag::MobileDevice, Flag::TouchScreen, Flag::IsTablet, Flag::IsRobot];

    /// Property name as the service spells it.
    pub fn name(&self) -> &'static str {
        match self {
            Flag::MobileDevice => "mobileDevice",
            Flag::TouchScreen => "touchScreen",
            Flag::IsTablet => "isTablet",
            Flag::IsRobot => "isRobot",
        }
    }
}

impl PropertyBag {
    pub fn flag(&self, flag: Flag) -> bool {
        let value = match flag {
            Flag::MobileDevice => self.mobile_device,
            Flag::TouchScreen => self.touch_screen,
            Flag::IsTablet => self.is_tablet,
            Flag::IsRobot => self.is_robot,
        };
        value.unwrap_or(false)
    }

    /// Builder used by tests and the rule table.
    pub fn with(mut self, flag: Flag) -> Self {
        match flag {
            Flag::MobileDevice => self.mobile_device = Some(true),
            Flag::TouchScreen => self.touch_screen = Some(true),
            Flag::IsTablet => self.is_tablet = Some(true),
            Flag::IsRobot => self.is_robot = Some(true),
        }
        self
    }
}
