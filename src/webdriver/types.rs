//! WebDriver wire types
//!
//! Request payloads and response envelopes of the W3C WebDriver protocol with
//! the Appium vendor extensions the runner uses.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::classify::codes;
use crate::config::{CapabilitySet, Platform};

/// Key of a W3C element reference object
pub const ELEMENT_KEY: &str = "element-6066-11e4-a4be-4d2a9a9c9e3e";

/// Key used by pre-W3C (JSONWP) servers
pub const LEGACY_ELEMENT_KEY: &str = "ELEMENT";

/// Error reported by the backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code} ({status}): {message}")]
pub struct ProtocolError {
    /// HTTP status of the response
    pub status: u16,
    /// W3C error code (e.g. "no such element")
    pub code: String,
    /// Human readable message
    pub message: String,
}

impl ProtocolError {
    pub fn new<C: Into<String>, M: Into<String>>(status: u16, code: C, message: M) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn no_such_element<M: Into<String>>(message: M) -> Self {
        Self::new(404, codes::NO_SUCH_ELEMENT, message)
    }

    pub fn stale_element<M: Into<String>>(message: M) -> Self {
        Self::new(404, codes::STALE_ELEMENT_REFERENCE, message)
    }

    pub fn session_not_created<M: Into<String>>(message: M) -> Self {
        Self::new(500, codes::SESSION_NOT_CREATED, message)
    }

    pub fn invalid_session<M: Into<String>>(message: M) -> Self {
        Self::new(404, codes::INVALID_SESSION_ID, message)
    }

    pub fn unknown<M: Into<String>>(message: M) -> Self {
        Self::new(500, codes::UNKNOWN_ERROR, message)
    }
}

/// Response envelope: every WebDriver response wraps its payload in `value`
#[derive(Debug, Clone, Deserialize)]
pub struct WireResponse {
    #[serde(default)]
    pub value: Value,
}

/// Error body carried inside `value`
#[derive(Debug, Clone, Deserialize)]
pub struct WireError {
    pub error: String,
    #[serde(default)]
    pub message: String,
}

/// `value` of a successful new-session response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSessionValue {
    pub session_id: String,
    #[serde(default)]
    pub capabilities: Value,
}

/// Body of a find-element request
#[derive(Debug, Clone, Serialize)]
pub struct FindElementRequest<'a> {
    pub using: &'a str,
    pub value: &'a str,
}

/// Extract the error carried by a response, if any
pub fn wire_error(status: u16, value: &Value) -> Option<ProtocolError> {
    let error: WireError = serde_json::from_value(value.clone()).ok()?;
    Some(ProtocolError::new(status, error.error, error.message))
}

/// Extract an element id from a find-element response value
pub fn element_id(value: &Value) -> Option<String> {
    value
        .get(ELEMENT_KEY)
        .or_else(|| value.get(LEGACY_ELEMENT_KEY))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// Build the new-session payload for a capability set
pub fn new_session_payload(capabilities: &CapabilitySet) -> Value {
    let mut always_match = Map::new();
    always_match.insert(
        "platformName".into(),
        json!(capabilities.platform_name.to_string()),
    );
    always_match.insert(
        "appium:automationName".into(),
        json!(capabilities.automation_engine()),
    );
    always_match.insert("appium:udid".into(), json!(capabilities.device_address));

    match capabilities.platform_name {
        Platform::Android => {
            always_match.insert("appium:appPackage".into(), json!(capabilities.app_package));
            if let Some(activity) = &capabilities.app_entry_point {
                always_match.insert("appium:appActivity".into(), json!(activity));
            }
        }
        Platform::Ios => {
            always_match.insert("appium:bundleId".into(), json!(capabilities.app_package));
        }
    }

    always_match.insert(
        "appium:noReset".into(),
        json!(capabilities.reset_policy.no_reset()),
    );
    always_match.insert(
        "appium:adbExecTimeout".into(),
        json!(capabilities.exec_timeout_ms),
    );

    json!({
        "capabilities": {
            "alwaysMatch": Value::Object(always_match),
            "firstMatch": [{}],
        }
    })
}
