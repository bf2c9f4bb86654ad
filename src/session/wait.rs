//! Bounded polling resolution of locators
//!
//! A poll finds the first element matching the locator and probes whether it is
//! displayed. "Not found" and "stale" answers are expected while the screen is
//! still changing, so the loop keeps polling until the deadline. Any other
//! backend failure ends the wait immediately.
//!
//! The final poll happens exactly at the deadline: an element that becomes
//! available at `d` resolves with a timeout of `d`.

use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, instrument};

use super::element::ElementHandle;
use super::remote::Session;
use crate::classify::{classify, ErrorKind};
use crate::locator::Locator;
use crate::Error;

/// Default interval between polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Diagnostics for a wait that ran out of time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitTimeout {
    pub locator: Locator,
    pub elapsed: Duration,
    pub attempts: u32,
    /// Whether any poll located the element in the tree
    pub located: bool,
    /// Kind of the last transient failure seen, if any
    pub last_failure: Option<ErrorKind>,
}

impl WaitTimeout {
    /// Classified kind of this timeout
    ///
    /// An element that never appeared is `NotFound`; one that was located but
    /// never became usable (stale or hidden until the end) is `Timeout`.
    pub fn kind(&self) -> ErrorKind {
        if self.located {
            ErrorKind::Timeout
        } else {
            ErrorKind::NotFound
        }
    }
}

/// Result of resolving a locator
#[derive(Debug)]
pub enum WaitOutcome<'s> {
    Resolved(ElementHandle<'s>),
    TimedOut(WaitTimeout),
    Fatal(Error),
}

/// What a single poll observed
enum Poll<'s> {
    Found(ElementHandle<'s>),
    Hidden,
    Transient(ErrorKind),
    Fatal(Error),
}

/// Polling wait strategy
#[derive(Debug, Clone, Copy)]
pub struct WaitStrategy {
    poll_interval: Duration,
}

impl WaitStrategy {
    /// Create a wait strategy polling every `poll_interval`
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Resolve `locator` to a displayed element within `timeout`
    #[instrument(skip(self, session, locator), fields(locator = %locator))]
    pub async fn resolve<'s>(
        &self,
        session: &'s Session,
        locator: &Locator,
        timeout: Duration,
    ) -> WaitOutcome<'s> {
        let started = Instant::now();
        let deadline = started + timeout;
        let mut attempts = 0u32;
        let mut located = false;
        let mut last_failure = None;

        loop {
            attempts += 1;
            match Self::poll(session, locator).await {
                Poll::Found(element) => {
                    debug!("Resolved after {} attempt(s)", attempts);
                    return WaitOutcome::Resolved(element);
                }
                Poll::Hidden => {
                    located = true;
                    debug!("Attempt {}: located but not displayed", attempts);
                }
                Poll::Transient(kind) => {
                    if kind == ErrorKind::Stale {
                        located = true;
                    }
                    last_failure = Some(kind);
                    debug!("Attempt {}: {}", attempts, kind);
                }
                Poll::Fatal(error) => return WaitOutcome::Fatal(error),
            }

            let now = Instant::now();
            if now >= deadline {
                return WaitOutcome::TimedOut(WaitTimeout {
                    locator: locator.clone(),
                    elapsed: now - started,
                    attempts,
                    located,
                    last_failure,
                });
            }

            sleep_until((now + self.poll_interval).min(deadline)).await;
        }
    }

    async fn poll<'s>(session: &'s Session, locator: &Locator) -> Poll<'s> {
        let element = match session.find_element(locator).await {
            Ok(element) => element,
            Err(error) => return Self::triage(error),
        };

        match element.is_displayed().await {
            Ok(true) => Poll::Found(element),
            Ok(false) => Poll::Hidden,
            Err(error) => Self::triage(error),
        }
    }

    fn triage<'s>(error: Error) -> Poll<'s> {
        match classify(&error) {
            kind @ (ErrorKind::NotFound | ErrorKind::Stale) => Poll::Transient(kind),
            _ => Poll::Fatal(error),
        }
    }
}

impl Default for WaitStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}
