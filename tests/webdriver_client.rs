//! WebDriver client tests against a local HTTP stub
//!
//! Checks the wire format of each command and how server errors are mapped.

mod common;

use appium_runner::webdriver::mock::MOCK_PNG;
use appium_runner::webdriver::{AutomationBackend, WebDriverClient, ELEMENT_KEY};
use appium_runner::{Error, ErrorKind};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use common::*;
use mockito::{Matcher, Server};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn client(server: &Server) -> WebDriverClient {
    WebDriverClient::new(server.url(), Duration::from_secs(5)).expect("Failed to create client")
}

fn error_body(code: &str, message: &str) -> String {
    json!({ "value": { "error": code, "message": message, "stacktrace": "" } }).to_string()
}

#[tokio::test]
async fn test_new_session_sends_capabilities() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/session")
        .match_body(Matcher::PartialJson(json!({
            "capabilities": {
                "alwaysMatch": {
                    "platformName": "Android",
                    "appium:automationName": "UiAutomator2",
                    "appium:udid": "10.11.1.1:5001",
                    "appium:appPackage": APP_PACKAGE,
                    "appium:noReset": true
                }
            }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"value":{"sessionId":"s1","capabilities":{}}}"#)
        .create_async()
        .await;

    let session = client(&server)
        .new_session(&cafe_capabilities())
        .await
        .expect("session should open");

    assert_eq!(session, "s1");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_session_not_created_is_session_failure() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/session")
        .with_status(500)
        .with_body(error_body("session not created", "device 10.11.1.1:5001 is offline"))
        .create_async()
        .await;

    let err = client(&server)
        .new_session(&cafe_capabilities())
        .await
        .unwrap_err();

    match &err {
        Error::Protocol(e) => {
            assert_eq!(e.status, 500);
            assert_eq!(e.code, "session not created");
            assert!(e.message.contains("offline"));
        }
        other => panic!("expected protocol error, got {:?}", other),
    }
    assert_eq!(err.kind(), ErrorKind::SessionFailure);
}

#[tokio::test]
async fn test_find_element_wire_format() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/session/s1/element")
        .match_body(Matcher::Json(json!({
            "using": "accessibility id",
            "value": "Open"
        })))
        .with_status(200)
        .with_body(json!({ "value": { ELEMENT_KEY: "e1" } }).to_string())
        .create_async()
        .await;

    let element = client(&server)
        .find_element("s1", "accessibility id", "Open")
        .await
        .expect("element should be found");

    assert_eq!(element, "e1");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_element_errors_are_classified() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/session/s1/element")
        .with_status(404)
        .with_body(error_body("no such element", "An element could not be located"))
        .create_async()
        .await;
    server
        .mock("GET", "/session/s1/element/e1/displayed")
        .with_status(404)
        .with_body(error_body("stale element reference", "The element is not attached"))
        .create_async()
        .await;

    let client = client(&server);

    let err = client.find_element("s1", "id", "missing").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = client.is_displayed("s1", "e1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Stale);
}

#[tokio::test]
async fn test_element_commands() {
    let mut server = Server::new_async().await;
    let displayed = server
        .mock("GET", "/session/s1/element/e1/displayed")
        .with_status(200)
        .with_body(r#"{"value":true}"#)
        .create_async()
        .await;
    let keys = server
        .mock("POST", "/session/s1/element/e1/value")
        .match_body(Matcher::Json(json!({ "text": "Username123" })))
        .with_status(200)
        .with_body(r#"{"value":null}"#)
        .create_async()
        .await;
    let click = server
        .mock("POST", "/session/s1/element/e1/click")
        .with_status(200)
        .with_body(r#"{"value":null}"#)
        .create_async()
        .await;

    let client = client(&server);
    assert!(client.is_displayed("s1", "e1").await.expect("displayed"));
    client.send_keys("s1", "e1", "Username123").await.expect("send keys");
    client.click("s1", "e1").await.expect("click");

    displayed.assert_async().await;
    keys.assert_async().await;
    click.assert_async().await;
}

#[tokio::test]
async fn test_screenshot_is_decoded() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/session/s1/screenshot")
        .with_status(200)
        .with_body(json!({ "value": BASE64.encode(MOCK_PNG) }).to_string())
        .create_async()
        .await;

    let png = client(&server).screenshot("s1").await.expect("screenshot");
    assert_eq!(png, MOCK_PNG);
}

#[tokio::test]
async fn test_non_json_body_is_invalid_response() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/session/s1/screenshot")
        .with_status(502)
        .with_body("<html>Bad Gateway</html>")
        .create_async()
        .await;

    let err = client(&server).screenshot("s1").await.unwrap_err();
    assert!(matches!(err, Error::InvalidResponse(_)));
    assert_eq!(err.kind(), ErrorKind::Unknown);
}

#[tokio::test]
async fn test_unreachable_server_is_session_failure() {
    let client = WebDriverClient::new("http://127.0.0.1:1", Duration::from_secs(2))
        .expect("Failed to create client");

    let err = client.new_session(&cafe_capabilities()).await.unwrap_err();
    assert!(matches!(err, Error::Http(_)));
    assert_eq!(err.kind(), ErrorKind::SessionFailure);
}

#[tokio::test]
async fn test_full_run_over_http() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut server = Server::new_async().await;

    let ok = r#"{"value":null}"#;
    let mut mocks = vec![
        server
            .mock("POST", "/session")
            .with_body(r#"{"value":{"sessionId":"s1","capabilities":{}}}"#)
            .create_async()
            .await,
        server
            .mock("POST", "/session/s1/timeouts")
            .match_body(Matcher::Json(json!({ "implicit": 5000 })))
            .with_body(ok)
            .create_async()
            .await,
        server
            .mock("POST", "/session/s1/element")
            .with_body(json!({ "value": { ELEMENT_KEY: "e1" } }).to_string())
            .expect(3)
            .create_async()
            .await,
        server
            .mock("GET", "/session/s1/element/e1/displayed")
            .with_body(r#"{"value":true}"#)
            .expect(3)
            .create_async()
            .await,
        server
            .mock("POST", "/session/s1/element/e1/value")
            .with_body(ok)
            .expect(2)
            .create_async()
            .await,
        server
            .mock("POST", "/session/s1/element/e1/click")
            .with_body(ok)
            .create_async()
            .await,
        server
            .mock("GET", "/session/s1/screenshot")
            .with_body(json!({ "value": BASE64.encode(MOCK_PNG) }).to_string())
            .create_async()
            .await,
    ];
    mocks.push(
        server
            .mock("DELETE", "/session/s1")
            .with_body(ok)
            .create_async()
            .await,
    );

    let manager = create_manager(Arc::new(client(&server)), dir.path());
    let result = manager.run(&cafe_capabilities(), &login_script()).await;

    assert!(result.success(), "run failed: {:?}", result.failure);
    assert_eq!(
        std::fs::read(dir.path().join("login_done.png")).expect("artifact on disk"),
        MOCK_PNG
    );
    for mock in &mocks {
        mock.assert_async().await;
    }
}
