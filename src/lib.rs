//! Appium-Runner: scripted mobile app automation over the WebDriver protocol
//!
//! This library opens an Appium session against a device, runs a script of
//! locate/act/checkpoint steps with bounded waits, and always tears the
//! session down.

pub mod classify;
pub mod config;
pub mod error;
pub mod locator;
pub mod logging;
pub mod script;
pub mod session;
pub mod webdriver;

// Re-exports
pub use classify::ErrorKind;
pub use error::{Error, Result};
pub use locator::{Locator, Strategy};

/// Appium-Runner library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
