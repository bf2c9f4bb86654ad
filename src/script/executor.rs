//! Step executor
//!
//! Runs the steps of a script in order against an active session, stopping at
//! the first fatal failure. A step that panics is reported as an `Unknown`
//! failure instead of unwinding through the caller.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use super::result::{Artifact, RunFailure, RunResult};
use super::{Script, Step, StepKind};
use crate::classify::ErrorKind;
use crate::config::RunnerConfig;
use crate::locator::Locator;
use crate::session::{ElementAction, Session, WaitOutcome, WaitStrategy};
use crate::{Error, Result};

/// Executes scripts step by step
#[derive(Debug, Clone)]
pub struct StepExecutor {
    wait: WaitStrategy,
    default_timeout: Duration,
    artifact_dir: PathBuf,
}

impl StepExecutor {
    pub fn new(wait: WaitStrategy, default_timeout: Duration, artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            wait,
            default_timeout,
            artifact_dir: artifact_dir.into(),
        }
    }

    /// Executor using the configured poll interval, explicit wait and artifact directory
    pub fn from_config(config: &RunnerConfig) -> Result<Self> {
        Ok(Self::new(
            WaitStrategy::new(config.poll_interval()),
            config.explicit_wait(),
            config.artifact_dir()?,
        ))
    }

    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Run every step of `script` against `session`
    pub async fn run(&self, session: &Session, script: &Script) -> RunResult {
        let total = script.len();
        let mut artifacts = Vec::new();

        for (index, step) in script.steps.iter().enumerate() {
            if let Some(milestone) = &step.milestone {
                info!("{}", milestone);
            }
            debug!("Step {}/{}: {}", index + 1, total, step);

            let outcome = AssertUnwindSafe(self.run_step(session, step))
                .catch_unwind()
                .await;

            let failure = match outcome {
                Ok(Ok(artifact)) => {
                    artifacts.extend(artifact);
                    continue;
                }
                Ok(Err(failure)) => failure,
                Err(panic) => RunFailure::new(
                    ErrorKind::Unknown,
                    format!("step panicked: {}", panic_message(panic.as_ref())),
                ),
            };

            return RunResult::failed(failure.at_step(index), artifacts, index);
        }

        RunResult::completed(artifacts, total)
    }

    async fn run_step(
        &self,
        session: &Session,
        step: &Step,
    ) -> std::result::Result<Option<Artifact>, RunFailure> {
        let timeout = step.timeout.unwrap_or(self.default_timeout);

        match &step.kind {
            StepKind::Type { locator, text } => {
                self.locate_and_act(session, locator, ElementAction::TypeText(text), timeout)
                    .await?;
                Ok(None)
            }
            StepKind::Click { locator } => {
                self.locate_and_act(session, locator, ElementAction::Click, timeout)
                    .await?;
                Ok(None)
            }
            StepKind::Checkpoint { name } => self.checkpoint(session, name).await.map(Some),
        }
    }

    /// Resolve `locator` and perform `action`, resolving again if the element
    /// goes stale before the action lands. All attempts share `timeout`.
    async fn locate_and_act(
        &self,
        session: &Session,
        locator: &Locator,
        action: ElementAction<'_>,
        timeout: Duration,
    ) -> std::result::Result<(), RunFailure> {
        let started = Instant::now();
        let deadline = started + timeout;
        let mut went_stale = false;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let element = match self.wait.resolve(session, locator, remaining).await {
                WaitOutcome::Resolved(element) => element,
                WaitOutcome::TimedOut(mut timeout) => {
                    timeout.elapsed = started.elapsed();
                    timeout.located |= went_stale;
                    return Err(RunFailure::from_timeout(&timeout));
                }
                WaitOutcome::Fatal(error) => {
                    return Err(RunFailure::from_error(&error).with_locator(locator.clone()));
                }
            };

            let error = match element.act(action).await {
                Ok(()) => return Ok(()),
                Err(error) => error,
            };

            if error.kind() != ErrorKind::Stale {
                return Err(RunFailure::from_error(&error).with_locator(locator.clone()));
            }

            went_stale = true;
            let now = Instant::now();
            if now >= deadline {
                let mut failure = RunFailure::new(
                    ErrorKind::Timeout,
                    format!("{} kept going stale before {} landed", locator, action),
                )
                .with_locator(locator.clone());
                failure.waited = Some(now - started);
                return Err(failure);
            }

            warn!("{} went stale before {}; resolving again", locator, action);
            sleep_until((now + self.wait.poll_interval()).min(deadline)).await;
        }
    }

    async fn checkpoint(
        &self,
        session: &Session,
        name: &str,
    ) -> std::result::Result<Artifact, RunFailure> {
        let path = artifact_path(&self.artifact_dir, name)
            .map_err(|error| RunFailure::from_error(&error))?;

        info!("Saving screenshot as {}", name);
        let png = session
            .screenshot()
            .await
            .map_err(|error| RunFailure::from_error(&error))?;

        tokio::fs::write(&path, &png)
            .await
            .map_err(|error| RunFailure::from_error(&Error::from(error)))?;
        info!("Saved screenshot.");

        Ok(Artifact {
            name: name.to_string(),
            path,
            bytes: png.len(),
        })
    }
}

/// Where a checkpoint lands: `name` joined onto `dir` as given, so an
/// absolute name replaces `dir` entirely
fn artifact_path(dir: &Path, name: &str) -> Result<PathBuf> {
    if name.trim().is_empty() {
        return Err(Error::script("Checkpoint name must not be empty"));
    }
    Ok(dir.join(name))
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CapabilitySet, ResetPolicy};
    use crate::webdriver::mock::MOCK_PNG;
    use crate::webdriver::{MockBackend, MockElement, ProtocolError};
    use std::sync::Arc;

    async fn open(backend: Arc<MockBackend>) -> Session {
        let mut session = Session::new(
            backend,
            CapabilitySet::android("com.example", ".Main", ResetPolicy::Preserve),
        );
        session.open().await.unwrap();
        session
    }

    fn executor(dir: &Path) -> StepExecutor {
        StepExecutor::new(WaitStrategy::default(), Duration::from_secs(5), dir)
    }

    #[test]
    fn test_artifact_path() {
        let dir = Path::new("/work");
        assert_eq!(artifact_path(dir, "login_done").unwrap(), dir.join("login_done"));
        assert_eq!(artifact_path(dir, "blog.png").unwrap(), dir.join("blog.png"));
        assert_eq!(
            artifact_path(dir, "artifacts/blog.png").unwrap(),
            dir.join("artifacts").join("blog.png")
        );
        assert_eq!(
            artifact_path(dir, "/tmp/out/pay.png").unwrap(),
            PathBuf::from("/tmp/out/pay.png")
        );
        assert!(artifact_path(dir, "").is_err());
        assert!(artifact_path(dir, "  ").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_checkpoint_writes_supplied_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("artifacts")).unwrap();
        let session = open(Arc::new(MockBackend::new())).await;

        let script = Script::new(vec![
            Step::checkpoint("artifacts/blog.png"),
            Step::checkpoint("login_done"),
        ]);
        let result = executor(dir.path()).run(&session, &script).await;

        assert!(result.success(), "run failed: {:?}", result.failure);
        let nested = result.artifact("artifacts/blog.png").unwrap();
        assert_eq!(nested.path, dir.path().join("artifacts").join("blog.png"));
        assert_eq!(std::fs::read(&nested.path).unwrap(), MOCK_PNG);

        let bare = result.artifact("login_done").unwrap();
        assert_eq!(bare.path, dir.path().join("login_done"));
        assert!(bare.path.exists());
        assert!(!dir.path().join("login_done.png").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_checkpoint_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let session = open(Arc::new(MockBackend::new())).await;

        let script = Script::new(vec![Step::checkpoint("absent/blog.png")]);
        let result = executor(dir.path()).run(&session, &script).await;

        let failure = result.failure.unwrap();
        assert_eq!(failure.step, Some(0));
        assert!(result.artifacts.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_steps_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(
            MockBackend::new()
                .with_ready_element("email")
                .with_ready_element("login"),
        );
        let session = open(backend.clone()).await;

        let script = Script::new(vec![
            Step::type_text(Locator::id("email"), "user"),
            Step::click(Locator::accessibility_id("login")),
            Step::checkpoint("done.png"),
        ]);
        let result = executor(dir.path()).run(&session, &script).await;

        assert!(result.success());
        assert_eq!(result.steps_completed, 3);
        assert_eq!(backend.journal().await, vec!["type:email:user", "click:login"]);

        let artifact = result.artifact("done.png").unwrap();
        assert_eq!(artifact.path, dir.path().join("done.png"));
        assert_eq!(std::fs::read(&artifact.path).unwrap(), MOCK_PNG);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_at_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockBackend::new().with_ready_element("after"));
        let session = open(backend.clone()).await;

        let script = Script::new(vec![
            Step::click(Locator::id("missing")).with_timeout(Duration::from_secs(1)),
            Step::click(Locator::id("after")),
            Step::checkpoint("never"),
        ]);
        let result = executor(dir.path()).run(&session, &script).await;

        let failure = result.failure.as_ref().unwrap();
        assert_eq!(failure.kind, ErrorKind::NotFound);
        assert_eq!(failure.step, Some(0));
        assert_eq!(failure.locator, Some(Locator::id("missing")));
        assert_eq!(result.steps_completed, 0);
        assert!(result.artifacts.is_empty());
        assert!(backend.journal().await.is_empty());
        assert_eq!(backend.screenshots(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_action_resolves_again() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(
            MockBackend::new().with_element("menu", MockElement::new().stale_actions(2)),
        );
        let session = open(backend.clone()).await;

        let script = Script::new(vec![Step::click(Locator::id("menu"))]);
        let result = executor(dir.path()).run(&session, &script).await;

        assert!(result.success());
        assert_eq!(backend.find_calls(), 3);
        assert_eq!(backend.journal().await, vec!["click:menu"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_action_until_budget_is_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(
            MockBackend::new().with_element("menu", MockElement::new().stale_actions(u32::MAX)),
        );
        let session = open(backend).await;

        let script = Script::new(vec![
            Step::click(Locator::id("menu")).with_timeout(Duration::from_secs(2)),
        ]);
        let result = executor(dir.path()).run(&session, &script).await;

        let failure = result.failure.unwrap();
        assert_eq!(failure.kind, ErrorKind::Timeout);
        assert!(failure.waited.unwrap() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_action_error_is_classified() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockBackend::new().with_element(
            "pay",
            MockElement::new().failing_action(ProtocolError::unknown("tap injection failed")),
        ));
        let session = open(backend).await;

        let script = Script::new(vec![Step::click(Locator::id("pay"))]);
        let result = executor(dir.path()).run(&session, &script).await;

        let failure = result.failure.unwrap();
        assert_eq!(failure.kind, ErrorKind::Unknown);
        assert!(failure.message.contains("tap injection failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_screenshot_failure_fails_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(
            MockBackend::new().failing_screenshot(ProtocolError::unknown("no display")),
        );
        let session = open(backend).await;

        let script = Script::new(vec![Step::checkpoint("shot.png")]);
        let result = executor(dir.path()).run(&session, &script).await;

        assert_eq!(result.error_kind(), Some(ErrorKind::Unknown));
        assert!(!dir.path().join("shot.png").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_panic_becomes_unknown_failure() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(
            MockBackend::new()
                .with_ready_element("button")
                .panicking_on_action(),
        );
        let session = open(backend).await;

        let script = Script::new(vec![
            Step::checkpoint("before"),
            Step::click(Locator::id("button")),
        ]);
        let result = executor(dir.path()).run(&session, &script).await;

        let failure = result.failure.as_ref().unwrap();
        assert_eq!(failure.kind, ErrorKind::Unknown);
        assert_eq!(failure.step, Some(1));
        assert!(failure.message.contains("panicked"));
        assert_eq!(result.artifacts.len(), 1);
    }
}
