//! Mock automation backend for testing
//!
//! This module provides a scriptable in-process backend: elements that appear
//! after a delay, stale references, hidden elements and injected failures.
//! Timing follows the tokio clock so paused-time tests are deterministic.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::traits::AutomationBackend;
use super::types::ProtocolError;
use crate::config::CapabilitySet;
use crate::Error;

/// A 1x1 PNG image
pub const MOCK_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D,
    0x49, 0x48, 0x44, 0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01,
    0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53, 0xDE,
];

/// Behaviour of one mock element
#[derive(Debug, Clone)]
pub struct MockElement {
    appears_after: Duration,
    displayed: bool,
    stale_probes: u32,
    stale_actions: u32,
    probe_error: Option<ProtocolError>,
    action_error: Option<ProtocolError>,
}

impl MockElement {
    /// An element that is rendered immediately
    pub fn new() -> Self {
        Self {
            appears_after: Duration::ZERO,
            displayed: true,
            stale_probes: 0,
            stale_actions: 0,
            probe_error: None,
            action_error: None,
        }
    }

    /// Render the element only after `delay` has passed since the backend was created
    pub fn appears_after(mut self, delay: Duration) -> Self {
        self.appears_after = delay;
        self
    }

    /// Keep the element in the tree but never displayed
    pub fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    /// Report the first `count` displayed probes as stale
    pub fn stale_probes(mut self, count: u32) -> Self {
        self.stale_probes = count;
        self
    }

    /// Report every displayed probe as stale
    pub fn always_stale(self) -> Self {
        self.stale_probes(u32::MAX)
    }

    /// Report the first `count` actions as stale
    pub fn stale_actions(mut self, count: u32) -> Self {
        self.stale_actions = count;
        self
    }

    /// Fail every displayed probe with `error`
    pub fn failing_probe(mut self, error: ProtocolError) -> Self {
        self.probe_error = Some(error);
        self
    }

    /// Fail every action with `error`
    pub fn failing_action(mut self, error: ProtocolError) -> Self {
        self.action_error = Some(error);
        self
    }
}

impl Default for MockElement {
    fn default() -> Self {
        Self::new()
    }
}

/// Mock automation backend
#[derive(Debug)]
pub struct MockBackend {
    epoch: Instant,
    elements: Mutex<HashMap<String, MockElement>>,
    refs: Mutex<HashMap<String, String>>,
    session: Mutex<Option<String>>,
    implicit_wait: Mutex<Option<Duration>>,
    journal: Mutex<Vec<String>>,
    open_error: Option<ProtocolError>,
    implicit_wait_error: Option<ProtocolError>,
    screenshot_error: Option<ProtocolError>,
    delete_error: Option<ProtocolError>,
    panic_on_action: bool,
    sessions_created: AtomicUsize,
    sessions_deleted: AtomicUsize,
    find_calls: AtomicUsize,
    screenshots: AtomicUsize,
    terminations: AtomicUsize,
}

impl MockBackend {
    /// Create a new mock backend with no elements
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            elements: Mutex::new(HashMap::new()),
            refs: Mutex::new(HashMap::new()),
            session: Mutex::new(None),
            implicit_wait: Mutex::new(None),
            journal: Mutex::new(Vec::new()),
            open_error: None,
            implicit_wait_error: None,
            screenshot_error: None,
            delete_error: None,
            panic_on_action: false,
            sessions_created: AtomicUsize::new(0),
            sessions_deleted: AtomicUsize::new(0),
            find_calls: AtomicUsize::new(0),
            screenshots: AtomicUsize::new(0),
            terminations: AtomicUsize::new(0),
        }
    }

    /// Register an element under its locator value
    pub fn with_element(mut self, value: impl Into<String>, element: MockElement) -> Self {
        self.elements.get_mut().insert(value.into(), element);
        self
    }

    /// Register an element that is rendered immediately
    pub fn with_ready_element(self, value: impl Into<String>) -> Self {
        self.with_element(value, MockElement::new())
    }

    /// Fail session creation
    pub fn failing_open(mut self, error: ProtocolError) -> Self {
        self.open_error = Some(error);
        self
    }

    /// Fail the implicit wait command
    pub fn failing_implicit_wait(mut self, error: ProtocolError) -> Self {
        self.implicit_wait_error = Some(error);
        self
    }

    /// Fail screenshot capture
    pub fn failing_screenshot(mut self, error: ProtocolError) -> Self {
        self.screenshot_error = Some(error);
        self
    }

    /// Fail session deletion (the call is still counted)
    pub fn failing_delete(mut self, error: ProtocolError) -> Self {
        self.delete_error = Some(error);
        self
    }

    /// Panic inside click / send keys
    pub fn panicking_on_action(mut self) -> Self {
        self.panic_on_action = true;
        self
    }

    /// Number of sessions created
    pub fn sessions_created(&self) -> usize {
        self.sessions_created.load(Ordering::SeqCst)
    }

    /// Number of delete-session calls
    pub fn sessions_deleted(&self) -> usize {
        self.sessions_deleted.load(Ordering::SeqCst)
    }

    /// Number of find-element calls
    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    /// Number of screenshots taken
    pub fn screenshots(&self) -> usize {
        self.screenshots.load(Ordering::SeqCst)
    }

    /// Number of terminate-app calls
    pub fn terminations(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }

    /// Implicit wait last set on the session
    pub async fn implicit_wait(&self) -> Option<Duration> {
        *self.implicit_wait.lock().await
    }

    /// Actions performed, in order (`type:<value>:<text>`, `click:<value>`)
    pub async fn journal(&self) -> Vec<String> {
        self.journal.lock().await.clone()
    }

    async fn check_session(&self, session_id: &str) -> Result<(), Error> {
        match self.session.lock().await.as_deref() {
            Some(current) if current == session_id => Ok(()),
            _ => Err(ProtocolError::invalid_session(format!("No session {}", session_id)).into()),
        }
    }

    async fn element_value(&self, element_id: &str) -> Result<String, Error> {
        self.refs
            .lock()
            .await
            .get(element_id)
            .cloned()
            .ok_or_else(|| ProtocolError::stale_element(format!("Unknown element {}", element_id)).into())
    }

    async fn perform(
        &self,
        session_id: &str,
        element_id: &str,
        action: &str,
        text: Option<&str>,
    ) -> Result<(), Error> {
        self.check_session(session_id).await?;
        let value = self.element_value(element_id).await?;

        if self.panic_on_action {
            panic!("mock backend panicked acting on {}", value);
        }

        {
            let mut elements = self.elements.lock().await;
            let element = elements
                .get_mut(&value)
                .ok_or_else(|| Error::from(ProtocolError::stale_element(format!("{} was removed", value))))?;

            if element.stale_actions > 0 {
                element.stale_actions -= 1;
                return Err(ProtocolError::stale_element(format!("{} went stale", value)).into());
            }

            if let Some(error) = &element.action_error {
                return Err(error.clone().into());
            }
        }

        let entry = match text {
            Some(text) => format!("{}:{}:{}", action, value, text),
            None => format!("{}:{}", action, value),
        };
        self.journal.lock().await.push(entry);
        Ok(())
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AutomationBackend for MockBackend {
    async fn new_session(&self, _capabilities: &CapabilitySet) -> Result<String, Error> {
        if let Some(error) = &self.open_error {
            return Err(error.clone().into());
        }

        let id = uuid::Uuid::new_v4().to_string();
        *self.session.lock().await = Some(id.clone());
        self.sessions_created.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    async fn set_implicit_wait(&self, session_id: &str, wait: Duration) -> Result<(), Error> {
        self.check_session(session_id).await?;
        if let Some(error) = &self.implicit_wait_error {
            return Err(error.clone().into());
        }
        *self.implicit_wait.lock().await = Some(wait);
        Ok(())
    }

    async fn find_element(&self, session_id: &str, _using: &str, value: &str) -> Result<String, Error> {
        self.check_session(session_id).await?;
        self.find_calls.fetch_add(1, Ordering::SeqCst);

        let rendered = self
            .elements
            .lock()
            .await
            .get(value)
            .map_or(false, |element| self.epoch.elapsed() >= element.appears_after);

        if !rendered {
            return Err(ProtocolError::no_such_element(format!("{} is not on screen", value)).into());
        }

        let id = uuid::Uuid::new_v4().to_string();
        self.refs.lock().await.insert(id.clone(), value.to_string());
        Ok(id)
    }

    async fn is_displayed(&self, session_id: &str, element_id: &str) -> Result<bool, Error> {
        self.check_session(session_id).await?;
        let value = self.element_value(element_id).await?;

        let mut elements = self.elements.lock().await;
        let element = elements
            .get_mut(&value)
            .ok_or_else(|| Error::from(ProtocolError::stale_element(format!("{} was removed", value))))?;

        if let Some(error) = &element.probe_error {
            return Err(error.clone().into());
        }

        if element.stale_probes > 0 {
            element.stale_probes = element.stale_probes.saturating_sub(1);
            return Err(ProtocolError::stale_element(format!("{} went stale", value)).into());
        }

        Ok(element.displayed)
    }

    async fn click(&self, session_id: &str, element_id: &str) -> Result<(), Error> {
        self.perform(session_id, element_id, "click", None).await
    }

    async fn send_keys(&self, session_id: &str, element_id: &str, text: &str) -> Result<(), Error> {
        self.perform(session_id, element_id, "type", Some(text)).await
    }

    async fn screenshot(&self, session_id: &str) -> Result<Vec<u8>, Error> {
        self.check_session(session_id).await?;
        if let Some(error) = &self.screenshot_error {
            return Err(error.clone().into());
        }
        self.screenshots.fetch_add(1, Ordering::SeqCst);
        Ok(MOCK_PNG.to_vec())
    }

    async fn terminate_app(&self, session_id: &str, app_id: &str) -> Result<bool, Error> {
        self.check_session(session_id).await?;
        self.terminations.fetch_add(1, Ordering::SeqCst);
        self.journal.lock().await.push(format!("terminate:{}", app_id));
        Ok(true)
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), Error> {
        self.sessions_deleted.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.delete_error {
            return Err(error.clone().into());
        }
        self.check_session(session_id).await?;
        *self.session.lock().await = None;
        Ok(())
    }
}
