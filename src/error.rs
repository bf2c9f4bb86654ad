//! Unified error types for Appium-Runner

use thiserror::Error;

use crate::webdriver::ProtocolError;

/// Unified Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for Appium-Runner
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport errors talking to the automation server
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Errors reported by the automation backend itself
    #[error("Backend error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Session lifecycle errors (operation on a session that is not active)
    #[error("Session error: {0}")]
    Session(String),

    /// Malformed backend responses
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Script errors
    #[error("Script error: {0}")]
    Script(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Create a new session error
    pub fn session<S: Into<String>>(msg: S) -> Self {
        Error::Session(msg.into())
    }

    /// Create a new invalid response error
    pub fn invalid_response<S: Into<String>>(msg: S) -> Self {
        Error::InvalidResponse(msg.into())
    }

    /// Create a new script error
    pub fn script<S: Into<String>>(msg: S) -> Self {
        Error::Script(msg.into())
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }

    /// Classified kind of this error
    pub fn kind(&self) -> crate::classify::ErrorKind {
        crate::classify::classify(self)
    }
}
