//! Configuration management for Appium-Runner
//!
//! One [`RunnerConfig`] is built at process start (from the environment or a
//! TOML file) and passed explicitly to the session manager.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Services IP used when none is given on the command line
pub const DEFAULT_SERVICES_IP: &str = "10.11.1.1";

/// ADB port exposed by the virtual device services address
pub const DEFAULT_ADB_PORT: u16 = 5001;

/// Default automation server endpoint
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:4723";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "APPIUM_RUNNER_";

/// Build the device address from an optional services IP
pub fn device_address(services_ip: Option<&str>) -> String {
    format!(
        "{}:{}",
        services_ip.unwrap_or(DEFAULT_SERVICES_IP),
        DEFAULT_ADB_PORT
    )
}

/// Target platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Platform {
    #[default]
    Android,
    #[serde(rename = "iOS")]
    Ios,
}

impl Platform {
    /// Automation engine used when none is configured
    pub fn default_engine(self) -> &'static str {
        match self {
            Platform::Android => "UiAutomator2",
            Platform::Ios => "XCUITest",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Android => f.write_str("Android"),
            Platform::Ios => f.write_str("iOS"),
        }
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "android" => Ok(Platform::Android),
            "ios" => Ok(Platform::Ios),
            other => Err(Error::configuration(format!("Unknown platform: {}", other))),
        }
    }
}

/// Whether the app keeps its state between sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetPolicy {
    /// Reuse existing app state (`noReset = true`)
    Preserve,
    /// Reset app state when the session starts (`noReset = false`)
    Reset,
}

impl ResetPolicy {
    /// Value of the `appium:noReset` capability
    pub fn no_reset(self) -> bool {
        matches!(self, ResetPolicy::Preserve)
    }
}

impl FromStr for ResetPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "preserve" => Ok(ResetPolicy::Preserve),
            "reset" => Ok(ResetPolicy::Reset),
            other => Err(Error::configuration(format!(
                "Unknown reset policy: {} (expected preserve or reset)",
                other
            ))),
        }
    }
}

fn default_device_address() -> String {
    device_address(None)
}

fn default_exec_timeout_ms() -> u64 {
    60_000
}

/// Capabilities needed to open a session
///
/// Only the options listed here are recognized; unknown keys in a config file
/// are rejected when it is parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CapabilitySet {
    #[serde(default)]
    pub platform_name: Platform,

    /// Backend driver name; the platform default when unset
    #[serde(default)]
    pub automation_engine: Option<String>,

    /// `host:port` of the target device
    #[serde(default = "default_device_address")]
    pub device_address: String,

    pub app_package: String,

    /// Activity to launch (Android only)
    #[serde(default)]
    pub app_entry_point: Option<String>,

    pub reset_policy: ResetPolicy,

    /// Upper bound for individual device-side calls
    #[serde(default = "default_exec_timeout_ms")]
    pub exec_timeout_ms: u64,
}

impl CapabilitySet {
    /// Android capabilities for the given app
    pub fn android(
        app_package: impl Into<String>,
        app_entry_point: impl Into<String>,
        reset_policy: ResetPolicy,
    ) -> Self {
        Self {
            platform_name: Platform::Android,
            automation_engine: None,
            device_address: default_device_address(),
            app_package: app_package.into(),
            app_entry_point: Some(app_entry_point.into()),
            reset_policy,
            exec_timeout_ms: default_exec_timeout_ms(),
        }
    }

    /// Set the device address
    pub fn with_device_address(mut self, address: impl Into<String>) -> Self {
        self.device_address = address.into();
        self
    }

    /// Effective automation engine
    pub fn automation_engine(&self) -> &str {
        self.automation_engine
            .as_deref()
            .unwrap_or_else(|| self.platform_name.default_engine())
    }

    /// Per-call execution timeout
    pub fn exec_timeout(&self) -> Duration {
        Duration::from_millis(self.exec_timeout_ms)
    }

    /// Check the set before it is sent to the backend
    pub fn validate(&self) -> Result<()> {
        if self.app_package.trim().is_empty() {
            return Err(Error::configuration("appPackage must not be empty"));
        }

        if self.platform_name == Platform::Android
            && self
                .app_entry_point
                .as_deref()
                .map_or(true, |a| a.trim().is_empty())
        {
            return Err(Error::configuration(
                "appEntryPoint is required on Android",
            ));
        }

        let (host, port) = self
            .device_address
            .rsplit_once(':')
            .ok_or_else(|| Error::configuration("deviceAddress must be host:port"))?;
        if host.is_empty() {
            return Err(Error::configuration("deviceAddress has an empty host"));
        }
        port.parse::<u16>().map_err(|_| {
            Error::configuration(format!("Invalid port in deviceAddress: {}", port))
        })?;

        Ok(())
    }
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_implicit_wait_ms() -> u64 {
    5_000
}

fn default_explicit_wait_ms() -> u64 {
    20_000
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_request_timeout_ms() -> u64 {
    120_000
}

/// Runner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfig {
    /// Automation server endpoint
    #[serde(default = "default_server_url")]
    pub server_url: String,

    pub capabilities: CapabilitySet,

    /// Implicit wait set on every new session, in milliseconds
    ///
    /// A real server holds each element lookup for up to this long before
    /// answering "not found", so one poll can take this long. Step timeouts
    /// below it can overrun by up to one implicit wait; `validate` therefore
    /// requires `explicit_wait_ms >= implicit_wait_ms`.
    #[serde(default = "default_implicit_wait_ms")]
    pub implicit_wait_ms: u64,

    /// Default resolution timeout for locate steps, in milliseconds
    #[serde(default = "default_explicit_wait_ms")]
    pub explicit_wait_ms: u64,

    /// Interval between resolution polls, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Timeout for a single HTTP request to the server, in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Directory for checkpoint screenshots; the working directory when unset
    #[serde(default)]
    pub artifact_dir: Option<PathBuf>,

    /// Terminate the app under test before closing the session
    #[serde(default)]
    pub terminate_on_teardown: bool,
}

impl RunnerConfig {
    /// Configuration with default timings
    pub fn new(capabilities: CapabilitySet) -> Self {
        Self {
            server_url: default_server_url(),
            capabilities,
            implicit_wait_ms: default_implicit_wait_ms(),
            explicit_wait_ms: default_explicit_wait_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            artifact_dir: None,
            terminate_on_teardown: false,
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from a key lookup (`APPIUM_RUNNER_*` names)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        let app_package = var("APP_PACKAGE")
            .ok_or_else(|| Error::configuration("APPIUM_RUNNER_APP_PACKAGE must be set"))?;
        let reset_policy: ResetPolicy = var("RESET_POLICY")
            .ok_or_else(|| {
                Error::configuration("APPIUM_RUNNER_RESET_POLICY must be set to preserve or reset")
            })?
            .parse()?;

        let mut capabilities = CapabilitySet {
            platform_name: Platform::default(),
            automation_engine: var("AUTOMATION_ENGINE"),
            device_address: var("DEVICE_ADDRESS").unwrap_or_else(default_device_address),
            app_package,
            app_entry_point: var("APP_ENTRY_POINT"),
            reset_policy,
            exec_timeout_ms: default_exec_timeout_ms(),
        };

        if let Some(platform) = var("PLATFORM") {
            capabilities.platform_name = platform.parse()?;
        }

        if let Some(timeout) = var("EXEC_TIMEOUT_MS") {
            capabilities.exec_timeout_ms = parse_number(&timeout, "APPIUM_RUNNER_EXEC_TIMEOUT_MS")?;
        }

        let mut config = RunnerConfig::new(capabilities);

        if let Some(url) = var("SERVER_URL") {
            config.server_url = url;
        }

        if let Some(wait) = var("IMPLICIT_WAIT_MS") {
            config.implicit_wait_ms = parse_number(&wait, "APPIUM_RUNNER_IMPLICIT_WAIT_MS")?;
        }

        if let Some(wait) = var("EXPLICIT_WAIT_MS") {
            config.explicit_wait_ms = parse_number(&wait, "APPIUM_RUNNER_EXPLICIT_WAIT_MS")?;
        }

        if let Some(interval) = var("POLL_INTERVAL_MS") {
            config.poll_interval_ms = parse_number(&interval, "APPIUM_RUNNER_POLL_INTERVAL_MS")?;
        }

        if let Some(timeout) = var("REQUEST_TIMEOUT_MS") {
            config.request_timeout_ms =
                parse_number(&timeout, "APPIUM_RUNNER_REQUEST_TIMEOUT_MS")?;
        }

        if let Some(dir) = var("ARTIFACT_DIR") {
            config.artifact_dir = Some(PathBuf::from(dir));
        }

        if let Some(terminate) = var("TERMINATE_ON_TEARDOWN") {
            config.terminate_on_teardown = terminate
                .parse()
                .map_err(|_| Error::configuration("Invalid APPIUM_RUNNER_TERMINATE_ON_TEARDOWN"))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: RunnerConfig = toml::from_str(content)
            .map_err(|e| Error::configuration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Point the capabilities at the device behind `services_ip`
    pub fn apply_services_ip(&mut self, services_ip: &str) {
        self.capabilities.device_address = device_address(Some(services_ip));
    }

    /// Check the whole configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(Error::configuration(format!(
                "server_url must be an http(s) URL: {}",
                self.server_url
            )));
        }

        if self.poll_interval_ms == 0 {
            return Err(Error::configuration("poll_interval_ms must be positive"));
        }

        if self.explicit_wait_ms < self.implicit_wait_ms {
            return Err(Error::configuration(format!(
                "explicit_wait_ms ({}) must not be shorter than implicit_wait_ms ({})",
                self.explicit_wait_ms, self.implicit_wait_ms
            )));
        }

        self.capabilities.validate()
    }

    pub fn implicit_wait(&self) -> Duration {
        Duration::from_millis(self.implicit_wait_ms)
    }

    pub fn explicit_wait(&self) -> Duration {
        Duration::from_millis(self.explicit_wait_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Directory checkpoint screenshots are written to
    pub fn artifact_dir(&self) -> Result<PathBuf> {
        match &self.artifact_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(env::current_dir()?),
        }
    }
}

fn parse_number(value: &str, name: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::configuration(format!("Invalid {}", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_device_address() {
        assert_eq!(device_address(None), "10.11.1.1:5001");
        assert_eq!(device_address(Some("10.0.0.7")), "10.0.0.7:5001");
    }

    #[test]
    fn test_explicit_wait_shorter_than_implicit_wait_rejected() {
        let result = RunnerConfig::from_lookup(lookup(&[
            ("APPIUM_RUNNER_APP_PACKAGE", "com.corellium.cafe"),
            ("APPIUM_RUNNER_APP_ENTRY_POINT", ".ui.activities.MainActivity"),
            ("APPIUM_RUNNER_RESET_POLICY", "preserve"),
            ("APPIUM_RUNNER_IMPLICIT_WAIT_MS", "5000"),
            ("APPIUM_RUNNER_EXPLICIT_WAIT_MS", "1000"),
        ]));
        assert!(matches!(result, Err(Error::Configuration(_))));

        let mut config = RunnerConfig::new(CapabilitySet::android(
            "com.corellium.cafe",
            ".MainActivity",
            ResetPolicy::Preserve,
        ));
        config.implicit_wait_ms = 0;
        config.explicit_wait_ms = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = RunnerConfig::from_lookup(lookup(&[
            ("APPIUM_RUNNER_APP_PACKAGE", "com.corellium.cafe"),
            ("APPIUM_RUNNER_APP_ENTRY_POINT", ".ui.activities.MainActivity"),
            ("APPIUM_RUNNER_RESET_POLICY", "preserve"),
        ]))
        .unwrap();

        assert_eq!(config.server_url, "http://127.0.0.1:4723");
        assert_eq!(config.implicit_wait(), Duration::from_secs(5));
        assert_eq!(config.explicit_wait(), Duration::from_secs(20));
        assert_eq!(config.capabilities.device_address, "10.11.1.1:5001");
        assert_eq!(config.capabilities.automation_engine(), "UiAutomator2");
        assert!(config.capabilities.reset_policy.no_reset());
        assert!(!config.terminate_on_teardown);
    }

    #[test]
    fn test_from_lookup_requires_reset_policy() {
        let result = RunnerConfig::from_lookup(lookup(&[
            ("APPIUM_RUNNER_APP_PACKAGE", "com.corellium.cafe"),
            ("APPIUM_RUNNER_APP_ENTRY_POINT", ".MainActivity"),
        ]));

        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_from_lookup_invalid_number() {
        let result = RunnerConfig::from_lookup(lookup(&[
            ("APPIUM_RUNNER_APP_PACKAGE", "com.corellium.cafe"),
            ("APPIUM_RUNNER_APP_ENTRY_POINT", ".MainActivity"),
            ("APPIUM_RUNNER_RESET_POLICY", "reset"),
            ("APPIUM_RUNNER_POLL_INTERVAL_MS", "fast"),
        ]));

        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_from_toml() {
        let config = RunnerConfig::from_toml_str(
            r#"
            server_url = "http://appium.local:4723"
            implicit_wait_ms = 2000
            explicit_wait_ms = 3000
            terminate_on_teardown = true

            [capabilities]
            platformName = "Android"
            appPackage = "com.corellium.cafe"
            appEntryPoint = ".ui.activities.MainActivity"
            resetPolicy = "reset"
            execTimeoutMs = 90000
            "#,
        )
        .unwrap();

        assert_eq!(config.server_url, "http://appium.local:4723");
        assert_eq!(config.implicit_wait(), Duration::from_secs(2));
        assert_eq!(config.explicit_wait(), Duration::from_secs(3));
        assert!(config.terminate_on_teardown);
        assert_eq!(config.capabilities.reset_policy, ResetPolicy::Reset);
        assert_eq!(config.capabilities.exec_timeout(), Duration::from_secs(90));
    }

    #[test]
    fn test_unknown_capability_key_rejected() {
        let result = RunnerConfig::from_toml_str(
            r#"
            [capabilities]
            appPackage = "com.corellium.cafe"
            appEntryPoint = ".MainActivity"
            resetPolicy = "preserve"
            autoGrantPermissions = true
            "#,
        );

        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_capability_validation() {
        let caps = CapabilitySet::android("com.corellium.cafe", ".MainActivity", ResetPolicy::Preserve);
        assert!(caps.validate().is_ok());

        let bad_address = caps.clone().with_device_address("10.11.1.1");
        assert!(bad_address.validate().is_err());

        let bad_port = caps.clone().with_device_address("10.11.1.1:adb");
        assert!(bad_port.validate().is_err());

        let mut no_activity = caps;
        no_activity.app_entry_point = None;
        assert!(no_activity.validate().is_err());
    }

    #[test]
    fn test_ios_needs_no_entry_point() {
        let mut caps = CapabilitySet::android("com.corellium.cafe", "", ResetPolicy::Preserve);
        caps.platform_name = Platform::Ios;
        caps.app_entry_point = None;

        assert!(caps.validate().is_ok());
        assert_eq!(caps.automation_engine(), "XCUITest");
    }

    #[test]
    fn test_apply_services_ip() {
        let caps = CapabilitySet::android("com.corellium.cafe", ".MainActivity", ResetPolicy::Reset);
        let mut config = RunnerConfig::new(caps);
        config.apply_services_ip("192.168.4.20");

        assert_eq!(config.capabilities.device_address, "192.168.4.20:5001");
    }
}
