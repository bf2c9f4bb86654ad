//! Backend failure classification
//!
//! Maps every error the engine can observe onto a small, fixed taxonomy and
//! decides whether the resolution loop may retry it.

use std::fmt;

use crate::Error;

/// W3C error codes the classifier recognizes
pub mod codes {
    pub const NO_SUCH_ELEMENT: &str = "no such element";
    pub const STALE_ELEMENT_REFERENCE: &str = "stale element reference";
    pub const TIMEOUT: &str = "timeout";
    pub const SCRIPT_TIMEOUT: &str = "script timeout";
    pub const INVALID_SESSION_ID: &str = "invalid session id";
    pub const SESSION_NOT_CREATED: &str = "session not created";
    pub const NO_SUCH_WINDOW: &str = "no such window";
    pub const UNKNOWN_ERROR: &str = "unknown error";
}

/// Classified failure kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The element never appeared
    NotFound,
    /// A found element reference was invalidated by a screen change
    Stale,
    /// A bound was exceeded without resolution
    Timeout,
    /// The backend session cannot be opened or reached
    SessionFailure,
    /// Anything the classifier does not recognize
    Unknown,
}

impl ErrorKind {
    /// Whether this kind aborts the run
    ///
    /// Only `Stale` is transient. Unrecognized conditions fail safe.
    pub fn is_fatal(self) -> bool {
        !matches!(self, ErrorKind::Stale)
    }

    /// Likely root causes, phrased for whoever reads the run log
    pub fn guidance(self) -> &'static [&'static str] {
        match self {
            ErrorKind::NotFound => &[
                "Check the locator strategy and value used for this step.",
                "The element may not be on screen yet; raise the step timeout.",
                "A previous step may have navigated to a different screen.",
            ],
            ErrorKind::Stale => &[
                "The screen changed after the element was located.",
                "The element may have been removed and re-added, such as during a relayout.",
            ],
            ErrorKind::Timeout => &[
                "The element was located but never became usable within the bound.",
                "The screen may keep re-rendering (animations, network-backed content).",
                "Raise the step timeout if the screen is known to be slow.",
            ],
            ErrorKind::SessionFailure => &[
                "Check that the automation server is running and reachable.",
                "Check the device address and that the device is booted.",
                "Check the capabilities: app package, entry point and automation engine.",
            ],
            ErrorKind::Unknown => &[
                "The backend reported a condition the runner does not recognize.",
                "Inspect the automation server log for details.",
            ],
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Stale => "Stale",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::SessionFailure => "SessionFailure",
            ErrorKind::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Classify a W3C error code
pub fn classify_code(code: &str) -> ErrorKind {
    match code {
        codes::NO_SUCH_ELEMENT => ErrorKind::NotFound,
        codes::STALE_ELEMENT_REFERENCE => ErrorKind::Stale,
        codes::TIMEOUT | codes::SCRIPT_TIMEOUT => ErrorKind::Timeout,
        codes::INVALID_SESSION_ID | codes::SESSION_NOT_CREATED | codes::NO_SUCH_WINDOW => {
            ErrorKind::SessionFailure
        }
        _ => ErrorKind::Unknown,
    }
}

/// Classify any engine error
pub fn classify(error: &Error) -> ErrorKind {
    match error {
        Error::Protocol(e) => classify_code(&e.code),
        Error::Http(e) if e.is_timeout() => ErrorKind::Timeout,
        Error::Http(_) => ErrorKind::SessionFailure,
        Error::Session(_) => ErrorKind::SessionFailure,
        Error::Io(_)
        | Error::Serialization(_)
        | Error::InvalidResponse(_)
        | Error::Script(_)
        | Error::Configuration(_) => ErrorKind::Unknown,
    }
}
