// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Device-type rule chain.
//!
//! A [`RuleSet`] is an ordered list of [`Rule`]s evaluated top to bottom,
//! starting from [`DeviceType::Desktop`]. A rule fires when the label reached
//! so far is one it upgrades from *and* its matcher accepts the input; firing
//! replaces the label. Every rule is evaluated exactly once, so ordering alone
//! decides precedence.
//!
//! The default chain:
//!
//! | # | rule              | from            | to       | signal                          |
//! |---|-------------------|-----------------|----------|---------------------------------|
//! | 1 | `mobile-device`   | desktop         | mobile   | `mobileDevice`                  |
//! | 2 | `touch-screen`    | mobile          | touch    | `touchScreen`                   |
//! | 3 | `tablet-flag`     | mobile, touch   | tablet   | `isTablet`                      |
//! | 4 | `robot`           | mobile          | touch    | `isRobot`                       |
//! | 5 | `tablet-token`    | mobile          | tablet   | identifier contains `Tablet`    |
//! | 6 | `windows-phone`   | mobile          | touch    | `Windows Phone 7`, `8` or `9`   |
//!
//! Rules 4-6 only see the residual `mobile` bucket: once one of them fires the
//! label is no longer `mobile` and the rest are skipped. They patch device
//! families the service reports without touch or tablet flags.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use crate::types::device::DeviceType;
use crate::types::properties::{Flag, PropertyBag};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Matcher {
    /// The service flag is present and `true`.
    Flag(Flag),
    /// The raw identifier contains any of these literal substrings.
    Contains(Vec<String>),
}

impl Matcher {
    pub fn contains<I, S>(needles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Matcher::Contains(needles.into_iter().map(Into::into).collect())
    }

    pub fn matches(&self, props: &PropertyBag, identifier: &str) -> bool {
        match self {
            Matcher::Flag(flag) => props.flag(*flag),
            Matcher::Contains(needles) => needles.iter().any(|n| identifier.contains(n.as_str())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rule {
    pub name: String,
    pub from: Vec<DeviceType>,
    pub to: DeviceType,
    pub matcher: Matcher,
}

impl Rule {
    pub fn new(name: impl Into<String>, from: &[DeviceType], to: DeviceType, matcher: Matcher) -> Self {
        Self {
            name: name.into(),
            from: from.to_vec(),
            to,
            matcher,
        }
    }

    fn fires(&self, current: DeviceType, props: &PropertyBag, identifier: &str) -> bool {
        self.from.contains(&current) && self.matcher.matches(props, identifier)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl Default for RuleSet {
    fn default() -> Self {
        use DeviceType::*;

        Self::new(vec![
            Rule::new("mobile-device", &[Desktop], Mobile, Matcher::Flag(Flag::MobileDevice)),
            Rule::new("touch-screen", &[Mobile], Touch, Matcher::Flag(Flag::TouchScreen)),
            Rule::new("tablet-flag", &[Mobile, Touch], Tablet, Matcher::Flag(Flag::IsTablet)),
            // Crawlers get the touch variant.
            Rule::new("robot", &[Mobile], Touch, Matcher::Flag(Flag::IsRobot)),
            // e.g. "Opera/9.80 (Android 4.2.1; Linux; Opera Tablet/ADR-1301080958)"
            Rule::new("tablet-token", &[Mobile], Tablet, Matcher::contains(["Tablet"])),
            // WP7 and later require a capacitive touchscreen.
            Rule::new(
                "windows-phone",
                &[Mobile],
                Touch,
                Matcher::contains(["Windows Phone 7", "Windows Phone 8", "Windows Phone 9"]),
            ),
        ])
    }
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Appends a rule after the existing ones.
    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn classify(&self, props: &PropertyBag, identifier: &str) -> DeviceType {
        self.rules.iter().fold(DeviceType::default(), |current, rule| {
            if rule.fires(current, props, identifier) {
                rule.to
            } else {
                current
            }
        })
    }

    /// Same as [`classify`](Self::classify) but also returns the names of the
    /// rules that fired, in order.
    pub fn explain(&self, props: &PropertyBag, identifier: &str) -> (DeviceType, Vec<&str>) {
        let mut current = DeviceType::default();
        let mut fired = Vec::new();
        for rule in &self.rules {
            if rule.fires(current, props, identifier) {
                current = rule.to;
                fired.push(rule.name.as_str());
            }
        }
        (current, fired)
    }
}
