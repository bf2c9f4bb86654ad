//! Automation backend traits
//!
//! This module defines the abstract interface the session layer talks to. One
//! implementation speaks HTTP to an Appium server, the other is an in-process
//! mock.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::CapabilitySet;

/// Automation backend trait
///
/// Every method maps to one WebDriver command. Session and element ids are the
/// opaque strings the backend handed out.
#[async_trait]
pub trait AutomationBackend: Send + Sync + std::fmt::Debug {
    /// Create a new session, returning its id
    async fn new_session(&self, capabilities: &CapabilitySet) -> Result<String, crate::Error>;

    /// Set the session's implicit wait
    async fn set_implicit_wait(&self, session_id: &str, wait: Duration) -> Result<(), crate::Error>;

    /// Find the first element matching `using`/`value`, returning its id
    async fn find_element(
        &self,
        session_id: &str,
        using: &str,
        value: &str,
    ) -> Result<String, crate::Error>;

    /// Check if an element is displayed
    async fn is_displayed(&self, session_id: &str, element_id: &str) -> Result<bool, crate::Error>;

    /// Click an element
    async fn click(&self, session_id: &str, element_id: &str) -> Result<(), crate::Error>;

    /// Type text into an element
    async fn send_keys(
        &self,
        session_id: &str,
        element_id: &str,
        text: &str,
    ) -> Result<(), crate::Error>;

    /// Capture a screenshot of the whole screen (PNG bytes)
    async fn screenshot(&self, session_id: &str) -> Result<Vec<u8>, crate::Error>;

    /// Terminate an app on the device, returning whether it was running
    async fn terminate_app(&self, session_id: &str, app_id: &str) -> Result<bool, crate::Error>;

    /// Delete the session
    async fn delete_session(&self, session_id: &str) -> Result<(), crate::Error>;
}
