//! Element handle implementation
//!
//! A handle borrows the session it was resolved in, so it cannot outlive it.

use std::fmt;
use tokio::time::Instant;
use tracing::debug;

use super::remote::Session;
use crate::locator::Locator;
use crate::Error;

/// An action performed on a resolved element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementAction<'a> {
    /// Type text into the element
    TypeText(&'a str),
    /// Click the element
    Click,
}

impl fmt::Display for ElementAction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementAction::TypeText(text) => write!(f, "type {:?}", text),
            ElementAction::Click => f.write_str("click"),
        }
    }
}

/// Reference to an element found in a session
#[derive(Debug)]
pub struct ElementHandle<'s> {
    session: &'s Session,
    element_id: String,
    locator: Locator,
    resolved_at: Instant,
}

impl<'s> ElementHandle<'s> {
    pub(crate) fn new(session: &'s Session, element_id: String, locator: Locator) -> Self {
        Self {
            session,
            element_id,
            locator,
            resolved_at: Instant::now(),
        }
    }

    /// Backend element id
    pub fn id(&self) -> &str {
        &self.element_id
    }

    /// Locator this element was resolved from
    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// When the element was resolved
    pub fn resolved_at(&self) -> Instant {
        self.resolved_at
    }

    /// Check if the element is displayed
    pub async fn is_displayed(&self) -> Result<bool, Error> {
        let session_id = self.session.active_id()?;
        self.session
            .backend()
            .is_displayed(session_id, &self.element_id)
            .await
    }

    /// Click the element
    pub async fn click(&self) -> Result<(), Error> {
        let session_id = self.session.active_id()?;
        self.session
            .backend()
            .click(session_id, &self.element_id)
            .await
    }

    /// Type text into the element
    pub async fn type_text(&self, text: &str) -> Result<(), Error> {
        let session_id = self.session.active_id()?;
        self.session
            .backend()
            .send_keys(session_id, &self.element_id, text)
            .await
    }

    /// Perform `action` on the element
    pub async fn act(&self, action: ElementAction<'_>) -> Result<(), Error> {
        debug!("{} on {}", action, self.locator);
        match action {
            ElementAction::TypeText(text) => self.type_text(text).await,
            ElementAction::Click => self.click().await,
        }
    }
}
