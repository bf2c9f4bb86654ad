//! Element locators

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::Platform;

/// How an element is searched for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Resource id (`com.example:id/loginButton`)
    Id,
    /// Accessibility id / content description
    AccessibilityId,
    /// Platform-native query: a UiSelector expression on Android, a
    /// predicate string on iOS
    PlatformQuery,
}

impl Strategy {
    /// Wire name of the strategy for the given platform
    pub fn using(self, platform: Platform) -> &'static str {
        match (self, platform) {
            (Strategy::Id, _) => "id",
            (Strategy::AccessibilityId, _) => "accessibility id",
            (Strategy::PlatformQuery, Platform::Android) => "-android uiautomator",
            (Strategy::PlatformQuery, Platform::Ios) => "-ios predicate string",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Id => f.write_str("id"),
            Strategy::AccessibilityId => f.write_str("accessibility-id"),
            Strategy::PlatformQuery => f.write_str("platform-query"),
        }
    }
}

/// A strategy and search value naming one element
///
/// When several elements match, the first in the backend's enumeration order
/// wins. Pick a specific instance by encoding it in the value, e.g.
/// `new UiSelector().resourceId("...").instance(0)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    pub strategy: Strategy,
    pub value: String,
}

impl Locator {
    pub fn new(strategy: Strategy, value: impl Into<String>) -> Self {
        Self {
            strategy,
            value: value.into(),
        }
    }

    pub fn id(value: impl Into<String>) -> Self {
        Self::new(Strategy::Id, value)
    }

    pub fn accessibility_id(value: impl Into<String>) -> Self {
        Self::new(Strategy::AccessibilityId, value)
    }

    pub fn platform_query(value: impl Into<String>) -> Self {
        Self::new(Strategy::PlatformQuery, value)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={:?}", self.strategy, self.value)
    }
}
