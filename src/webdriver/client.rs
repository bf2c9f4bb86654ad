//! WebDriver HTTP client
//!
//! Speaks the W3C WebDriver protocol (plus Appium extensions) to an Appium
//! server over HTTP.

use super::traits::AutomationBackend;
use super::types::*;
use crate::config::CapabilitySet;
use crate::Error;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Method;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

/// WebDriver client implementation
#[derive(Debug, Clone)]
pub struct WebDriverClient {
    http: reqwest::Client,
    /// Server endpoint (e.g., "http://127.0.0.1:4723")
    base_url: String,
}

impl WebDriverClient {
    /// Create a new WebDriver client
    ///
    /// # Arguments
    /// * `base_url` - Automation server endpoint
    /// * `request_timeout` - Upper bound for a single HTTP request
    pub fn new<S: Into<String>>(base_url: S, request_timeout: Duration) -> Result<Self, Error> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        info!("Creating WebDriver client for endpoint: {}", base_url);

        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;

        Ok(Self { http, base_url })
    }

    /// Server endpoint
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Execute a command and return the `value` of its response
    async fn execute(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, Error> {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        let envelope: WireResponse = if text.trim().is_empty() {
            WireResponse { value: Value::Null }
        } else {
            serde_json::from_str(&text).map_err(|e| {
                Error::invalid_response(format!("{} returned non-JSON body ({}): {}", url, status, e))
            })?
        };

        if let Some(error) = wire_error(status.as_u16(), &envelope.value) {
            debug!("Backend error on {}: {}", url, error);
            return Err(error.into());
        }

        if !status.is_success() {
            return Err(ProtocolError::new(
                status.as_u16(),
                "unknown error",
                format!("{} returned {}", url, status),
            )
            .into());
        }

        Ok(envelope.value)
    }

    fn session_path(session_id: &str, suffix: &str) -> String {
        format!("/session/{}{}", session_id, suffix)
    }

    fn element_path(session_id: &str, element_id: &str, suffix: &str) -> String {
        format!("/session/{}/element/{}{}", session_id, element_id, suffix)
    }
}

#[async_trait]
impl AutomationBackend for WebDriverClient {
    async fn new_session(&self, capabilities: &CapabilitySet) -> Result<String, Error> {
        let payload = new_session_payload(capabilities);
        let value = self.execute(Method::POST, "/session", Some(payload)).await?;

        let session: NewSessionValue = serde_json::from_value(value)
            .map_err(|e| Error::invalid_response(format!("Malformed new session response: {}", e)))?;

        info!("Created backend session {}", session.session_id);
        Ok(session.session_id)
    }

    async fn set_implicit_wait(&self, session_id: &str, wait: Duration) -> Result<(), Error> {
        self.execute(
            Method::POST,
            &Self::session_path(session_id, "/timeouts"),
            Some(json!({ "implicit": wait.as_millis() as u64 })),
        )
        .await?;
        Ok(())
    }

    async fn find_element(&self, session_id: &str, using: &str, value: &str) -> Result<String, Error> {
        let body = serde_json::to_value(FindElementRequest { using, value })?;
        let result = self
            .execute(Method::POST, &Self::session_path(session_id, "/element"), Some(body))
            .await?;

        element_id(&result)
            .ok_or_else(|| Error::invalid_response("Find element response carries no element reference"))
    }

    async fn is_displayed(&self, session_id: &str, element_id: &str) -> Result<bool, Error> {
        let value = self
            .execute(
                Method::GET,
                &Self::element_path(session_id, element_id, "/displayed"),
                None,
            )
            .await?;

        value
            .as_bool()
            .ok_or_else(|| Error::invalid_response("Displayed response is not a boolean"))
    }

    async fn click(&self, session_id: &str, element_id: &str) -> Result<(), Error> {
        self.execute(
            Method::POST,
            &Self::element_path(session_id, element_id, "/click"),
            Some(json!({})),
        )
        .await?;
        Ok(())
    }

    async fn send_keys(&self, session_id: &str, element_id: &str, text: &str) -> Result<(), Error> {
        self.execute(
            Method::POST,
            &Self::element_path(session_id, element_id, "/value"),
            Some(json!({ "text": text })),
        )
        .await?;
        Ok(())
    }

    async fn screenshot(&self, session_id: &str) -> Result<Vec<u8>, Error> {
        let value = self
            .execute(Method::GET, &Self::session_path(session_id, "/screenshot"), None)
            .await?;

        let data = value
            .as_str()
            .ok_or_else(|| Error::invalid_response("Screenshot response is not a string"))?;

        BASE64
            .decode(data)
            .map_err(|e| Error::invalid_response(format!("Failed to decode screenshot: {}", e)))
    }

    async fn terminate_app(&self, session_id: &str, app_id: &str) -> Result<bool, Error> {
        let value = self
            .execute(
                Method::POST,
                &Self::session_path(session_id, "/appium/device/terminate_app"),
                Some(json!({ "appId": app_id })),
            )
            .await?;

        Ok(value.as_bool().unwrap_or(false))
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), Error> {
        self.execute(Method::DELETE, &Self::session_path(session_id, ""), None)
            .await?;
        info!("Deleted backend session {}", session_id);
        Ok(())
    }
}
