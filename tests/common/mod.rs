//! Common test utilities
//!
//! This module provides shared fixtures for all integration tests.

#![allow(dead_code)]

use appium_runner::config::{CapabilitySet, ResetPolicy};
use appium_runner::script::{Script, Step, StepExecutor};
use appium_runner::session::{SessionManager, WaitStrategy};
use appium_runner::webdriver::AutomationBackend;
use appium_runner::Locator;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const APP_PACKAGE: &str = "com.corellium.cafe";

pub const EMAIL_FIELD: &str = "com.corellium.cafe:id/emailEditText";
pub const PASSWORD_FIELD: &str = "com.corellium.cafe:id/passwordEditText";
pub const LOGIN_BUTTON: &str = "com.corellium.cafe:id/loginButton";
pub const GUEST_BUTTON: &str = "com.corellium.cafe:id/guestButton";

/// Android capabilities for the cafe app
pub fn cafe_capabilities() -> CapabilitySet {
    CapabilitySet::android(APP_PACKAGE, ".ui.activities.MainActivity", ResetPolicy::Preserve)
}

/// Manager with a 500ms poll interval and a 20s default step timeout
pub fn create_manager(backend: Arc<dyn AutomationBackend>, artifact_dir: &Path) -> SessionManager {
    let executor = StepExecutor::new(WaitStrategy::default(), Duration::from_secs(20), artifact_dir);
    SessionManager::new(backend, executor, Duration::from_secs(5))
}

/// Log in with credentials and capture a checkpoint
pub fn login_script() -> Script {
    Script::named(
        "login",
        vec![
            Step::type_text(Locator::id(EMAIL_FIELD), "Username123")
                .with_milestone("Interact with login page."),
            Step::type_text(Locator::id(PASSWORD_FIELD), "Password123"),
            Step::click(Locator::id(LOGIN_BUTTON)),
            Step::checkpoint("login_done.png"),
        ],
    )
}
