//! Types for run results.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::classify::ErrorKind;
use crate::locator::Locator;
use crate::session::WaitTimeout;
use crate::Error;

/// A checkpoint screenshot written during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Checkpoint name
    pub name: String,

    /// Where the screenshot was written
    pub path: PathBuf,

    /// Size of the PNG in bytes
    pub bytes: usize,
}

/// The fatal failure that ended a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFailure {
    /// Classified kind
    pub kind: ErrorKind,

    /// Zero-based index of the failing step (None when no step was running)
    pub step: Option<usize>,

    /// What went wrong
    pub message: String,

    /// Locator that was being searched for, if any
    pub locator: Option<Locator>,

    /// How long the step waited before giving up
    pub waited: Option<Duration>,
}

impl RunFailure {
    /// Failure with an explicit kind
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            step: None,
            message: message.into(),
            locator: None,
            waited: None,
        }
    }

    /// Failure for an engine error, classified
    pub fn from_error(error: &Error) -> Self {
        Self::new(error.kind(), error.to_string())
    }

    /// Failure for a wait that ran out of time
    pub fn from_timeout(timeout: &WaitTimeout) -> Self {
        let message = if timeout.located {
            format!(
                "{} was located but never became usable within {:?} ({} attempts)",
                timeout.locator, timeout.elapsed, timeout.attempts
            )
        } else {
            format!(
                "{} did not appear within {:?} ({} attempts)",
                timeout.locator, timeout.elapsed, timeout.attempts
            )
        };

        Self {
            kind: timeout.kind(),
            step: None,
            message,
            locator: Some(timeout.locator.clone()),
            waited: Some(timeout.elapsed),
        }
    }

    pub fn at_step(mut self, index: usize) -> Self {
        self.step = Some(index);
        self
    }

    pub fn with_locator(mut self, locator: Locator) -> Self {
        self.locator = Some(locator);
        self
    }

    /// Multi-line diagnostic with likely root causes
    pub fn diagnostic(&self) -> String {
        let mut text = self.to_string();
        if let Some(locator) = &self.locator {
            text.push_str(&format!("\n  searched for: {}", locator));
        }
        if let Some(waited) = self.waited {
            text.push_str(&format!("\n  waited: {:?}", waited));
        }
        text.push_str("\n  things to check:");
        for hint in self.kind.guidance() {
            text.push_str("\n    * ");
            text.push_str(hint);
        }
        text
    }
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.step {
            Some(step) => write!(f, "{} at step {}: {}", self.kind, step + 1, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

/// Result of a complete run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    /// The fatal failure, if the run did not complete
    pub failure: Option<RunFailure>,

    /// Checkpoint screenshots written, in order
    pub artifacts: Vec<Artifact>,

    /// Number of steps that completed
    pub steps_completed: usize,
}

impl RunResult {
    pub fn completed(artifacts: Vec<Artifact>, steps_completed: usize) -> Self {
        Self {
            failure: None,
            artifacts,
            steps_completed,
        }
    }

    pub fn failed(failure: RunFailure, artifacts: Vec<Artifact>, steps_completed: usize) -> Self {
        Self {
            failure: Some(failure),
            artifacts,
            steps_completed,
        }
    }

    /// Whether every step completed
    pub fn success(&self) -> bool {
        self.failure.is_none()
    }

    /// Classified kind of the fatal failure
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.failure.as_ref().map(|f| f.kind)
    }

    /// Process exit code for this result
    pub fn exit_code(&self) -> u8 {
        if self.success() {
            0
        } else {
            1
        }
    }

    /// Artifact recorded under `name`
    pub fn artifact(&self, name: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.name == name)
    }
}
