//! Session manager implementation
//!
//! Owns the whole lifecycle of one run: open a session, apply the implicit
//! wait, execute the script, then tear down. Teardown happens on every path
//! that opened a session, and its own failures never replace the run outcome.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::remote::Session;
use crate::classify::ErrorKind;
use crate::config::{CapabilitySet, RunnerConfig};
use crate::script::{RunFailure, RunResult, Script, StepExecutor};
use crate::webdriver::AutomationBackend;
use crate::Error;

/// Runs scripts in sessions, one at a time
#[derive(Debug)]
pub struct SessionManager {
    backend: Arc<dyn AutomationBackend>,
    executor: StepExecutor,
    implicit_wait: Duration,
    terminate_on_teardown: bool,
    active: AtomicBool,
}

/// Clears the manager's active flag when the run ends, including on cancellation
struct ActiveGuard<'a>(&'a AtomicBool);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(
        backend: Arc<dyn AutomationBackend>,
        executor: StepExecutor,
        implicit_wait: Duration,
    ) -> Self {
        Self {
            backend,
            executor,
            implicit_wait,
            terminate_on_teardown: false,
            active: AtomicBool::new(false),
        }
    }

    /// Create a session manager from runner configuration
    pub fn from_config(backend: Arc<dyn AutomationBackend>, config: &RunnerConfig) -> Result<Self, Error> {
        let executor = StepExecutor::from_config(config)?;
        Ok(Self::new(backend, executor, config.implicit_wait())
            .with_terminate_on_teardown(config.terminate_on_teardown))
    }

    /// Terminate the app under test before closing the session
    pub fn with_terminate_on_teardown(mut self, terminate: bool) -> Self {
        self.terminate_on_teardown = terminate;
        self
    }

    /// Whether a run is in progress
    pub fn is_busy(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Open a session for `capabilities`, run `script`, and tear down
    pub async fn run(&self, capabilities: &CapabilitySet, script: &Script) -> RunResult {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            let failure = RunFailure::new(
                ErrorKind::SessionFailure,
                "another session is already active in this manager",
            );
            error!("{}", failure.diagnostic());
            return RunResult::failed(failure, Vec::new(), 0);
        }
        let _guard = ActiveGuard(&self.active);

        let result = self.run_session(capabilities, script).await;

        match &result.failure {
            Some(failure) => error!("{}", failure.diagnostic()),
            None => info!(
                "Run completed: {} step(s), {} screenshot(s)",
                result.steps_completed,
                result.artifacts.len()
            ),
        }

        result
    }

    async fn run_session(&self, capabilities: &CapabilitySet, script: &Script) -> RunResult {
        let mut session = Session::new(self.backend.clone(), capabilities.clone());

        info!("Loading target app in Appium session.");
        if let Err(error) = session.open().await {
            let failure = RunFailure::new(
                ErrorKind::SessionFailure,
                format!("could not open session: {}", error),
            );
            return RunResult::failed(failure, Vec::new(), 0);
        }
        info!("Successfully loaded target app.");

        let outcome = AssertUnwindSafe(self.execute(&mut session, script))
            .catch_unwind()
            .await;

        let result = match outcome {
            Ok(result) => result,
            Err(_) => RunResult::failed(
                RunFailure::new(ErrorKind::Unknown, "run panicked before completing"),
                Vec::new(),
                0,
            ),
        };

        self.teardown(&mut session).await;
        result
    }

    async fn execute(&self, session: &mut Session, script: &Script) -> RunResult {
        if let Err(error) = session.set_implicit_wait(self.implicit_wait).await {
            return RunResult::failed(RunFailure::from_error(&error), Vec::new(), 0);
        }

        for (index, step) in script.steps.iter().enumerate() {
            match step.timeout {
                Some(timeout) if timeout < self.implicit_wait => warn!(
                    "Step {} timeout {:?} is shorter than the {:?} implicit wait and may overrun",
                    index + 1,
                    timeout,
                    self.implicit_wait
                ),
                _ => {}
            }
        }

        info!("Starting app interactions on virtual device.");
        let result = self.executor.run(session, script).await;
        if result.success() {
            info!("Finished app interactions on virtual device.");
        }
        result
    }

    async fn teardown(&self, session: &mut Session) {
        if self.terminate_on_teardown {
            match session.terminate_app().await {
                Ok(stopped) => debug!("Terminated app under test: {}", stopped),
                Err(e) => warn!("Failed to terminate app under test: {}", e),
            }
        }

        info!("Closing appium session.");
        match session.close().await {
            Ok(()) => info!("Closed appium session."),
            Err(e) => warn!("Failed to close appium session cleanly: {}", e),
        }
    }
}
