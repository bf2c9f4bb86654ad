//! Remote session implementation
//!
//! Wraps one backend session and enforces its lifecycle:
//! `Uninitialized -> Active -> Closed`.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::element::ElementHandle;
use crate::config::{CapabilitySet, Platform};
use crate::locator::Locator;
use crate::webdriver::AutomationBackend;
use crate::Error;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not opened yet, or the open attempt failed
    Uninitialized,
    /// Connected to a live backend session
    Active,
    /// Closed; terminal
    Closed,
}

/// A connection to one device/app automation session
#[derive(Debug)]
pub struct Session {
    backend: Arc<dyn AutomationBackend>,
    capabilities: CapabilitySet,
    id: Option<String>,
    state: SessionState,
    implicit_wait: Duration,
}

impl Session {
    /// Create an unopened session for `capabilities`
    pub fn new(backend: Arc<dyn AutomationBackend>, capabilities: CapabilitySet) -> Self {
        Self {
            backend,
            capabilities,
            id: None,
            state: SessionState::Uninitialized,
            implicit_wait: Duration::ZERO,
        }
    }

    /// Backend session id, once opened
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn platform(&self) -> Platform {
        self.capabilities.platform_name
    }

    /// Implicit wait currently configured on the backend
    pub fn implicit_wait(&self) -> Duration {
        self.implicit_wait
    }

    pub(crate) fn backend(&self) -> &Arc<dyn AutomationBackend> {
        &self.backend
    }

    /// Session id, failing unless the session is active
    pub(crate) fn active_id(&self) -> Result<&str, Error> {
        match (self.state, self.id.as_deref()) {
            (SessionState::Active, Some(id)) => Ok(id),
            (state, _) => Err(Error::session(format!("Session is {:?}", state))),
        }
    }

    /// Open the backend session
    ///
    /// On failure the session stays `Uninitialized` and nothing needs closing.
    pub async fn open(&mut self) -> Result<(), Error> {
        if self.state != SessionState::Uninitialized {
            return Err(Error::session(format!(
                "Cannot open a session that is {:?}",
                self.state
            )));
        }

        self.capabilities.validate()?;
        let id = self.backend.new_session(&self.capabilities).await?;

        info!(
            "Opened session {} on {} for {}",
            id, self.capabilities.device_address, self.capabilities.app_package
        );
        self.id = Some(id);
        self.state = SessionState::Active;
        Ok(())
    }

    /// Set how long the backend waits server-side for elements on each find
    pub async fn set_implicit_wait(&mut self, wait: Duration) -> Result<(), Error> {
        let id = self.active_id()?;
        self.backend.set_implicit_wait(id, wait).await?;
        self.implicit_wait = wait;
        debug!("Implicit wait set to {:?}", wait);
        Ok(())
    }

    /// Look up the first element matching `locator` once, without waiting
    pub async fn find_element(&self, locator: &Locator) -> Result<ElementHandle<'_>, Error> {
        let id = self.active_id()?;
        let element_id = self
            .backend
            .find_element(id, locator.strategy.using(self.platform()), &locator.value)
            .await?;

        Ok(ElementHandle::new(self, element_id, locator.clone()))
    }

    /// Capture the whole screen as PNG bytes
    pub async fn screenshot(&self) -> Result<Vec<u8>, Error> {
        let id = self.active_id()?;
        self.backend.screenshot(id).await
    }

    /// Terminate the app under test
    pub async fn terminate_app(&self) -> Result<bool, Error> {
        let id = self.active_id()?;
        self.backend
            .terminate_app(id, &self.capabilities.app_package)
            .await
    }

    /// Close the session
    ///
    /// The session is `Closed` afterwards even if the backend call fails.
    /// Closing a session that was never opened, or closing twice, is a no-op.
    pub async fn close(&mut self) -> Result<(), Error> {
        match self.state {
            SessionState::Uninitialized | SessionState::Closed => Ok(()),
            SessionState::Active => {
                self.state = SessionState::Closed;
                let id = self.id.as_deref().unwrap_or_default();
                self.backend.delete_session(id).await?;
                info!("Closed session {}", id);
                Ok(())
            }
        }
    }
}
