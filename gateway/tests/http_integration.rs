// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! HTTP integration tests for the gateway.
//!
//! These tests use `axum-test` to drive the full Axum router (middleware
//! included) against an `httpmock` stand-in for the Proxmox API.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use axum::http::{Method, StatusCode};
use axum_test::TestServer;
use httpmock::prelude::*;
use proxmox_gateway::application::{AppState, Application, create_router};
use proxmox_gateway::configuration::GatewayOptions;
use reqwest::Url;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

const LOGIN_PATH: &str = "/api2/json/access/ticket";

/// Creates a test server whose upstream is `upstream`.
fn create_test_server(upstream: &MockServer) -> TestServer {
    let options = GatewayOptions::for_upstream(Url::parse(&upstream.base_url()).unwrap());
    let state = Arc::new(AppState::new(options).unwrap());
    TestServer::new(create_router(state)).unwrap()
}

async fn mock_login(upstream: &MockServer) -> httpmock::Mock<'_> {
    upstream
        .mock_async(|when, then| {
            when.method(POST)
                .path(LOGIN_PATH)
                .query_param("username", "api")
                .query_param("password", "secret");
            then.status(200)
                .json_body(json!({"data": {"ticket": "T1", "CSRFPreventionToken": "C1"}}));
        })
        .await
}

// =============================================================================
// Health and middleware
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_returns_status_ok_body() {
    let upstream = MockServer::start_async().await;
    let server = create_test_server(&upstream);
    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_json(&json!({"status": "ok"}));
}

#[tokio::test]
async fn test_responses_carry_cors_and_cache_headers() {
    let upstream = MockServer::start_async().await;
    let server = create_test_server(&upstream);
    let response = server.get("/health").await;

    assert_eq!(response.header("access-control-allow-origin"), "*");
    assert_eq!(response.header("access-control-allow-headers"), "*");
    assert_eq!(response.header("access-control-allow-methods"), "*");
    assert_eq!(response.header("vary"), "Origin");
    assert_eq!(response.header("pragma"), "no-cache");
    assert_eq!(
        response.header("cache-control"),
        "no-transform, no-cache, no-store, must-revalidate"
    );
}

#[tokio::test]
async fn test_options_short_circuits_with_no_content() {
    let upstream = MockServer::start_async().await;
    let any = upstream
        .mock_async(|when, then| {
            when.any_request();
            then.status(200);
        })
        .await;
    let server = create_test_server(&upstream);

    for path in [
        "/proxmox-api-commands/node/pve1/reboot",
        "/proxmox-api-commands/pve1/vm/100/start",
        "/does/not/exist",
    ] {
        let response = server.method(Method::OPTIONS, path).await;
        response.assert_status(StatusCode::NO_CONTENT);
        assert_eq!(response.header("access-control-allow-origin"), "*");
        assert!(response.text().is_empty());
    }

    any.assert_hits_async(0).await;
}

#[tokio::test]
async fn test_unknown_path_is_not_found_with_headers() {
    let upstream = MockServer::start_async().await;
    let server = create_test_server(&upstream);
    let response = server.get("/nope").await;
    response.assert_status_not_found();
    assert_eq!(response.header("pragma"), "no-cache");
}

// =============================================================================
// Node commands
// =============================================================================

#[tokio::test]
async fn test_node_reboot_relays_upstream_status_and_body() {
    let upstream = MockServer::start_async().await;
    let login = mock_login(&upstream).await;
    let command = upstream
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api2/json/nodes/pve1/status")
                .query_param("command", "reboot")
                .header("cookie", "PVEAuthCookie=T1")
                .header("csrfpreventiontoken", "C1");
            then.status(200).body("OK");
        })
        .await;
    let server = create_test_server(&upstream);

    let response = server.get("/proxmox-api-commands/node/pve1/reboot").await;

    response.assert_status_ok();
    response.assert_text("200\n\nOK");
    login.assert_hits_async(1).await;
    command.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_node_command_outside_whitelist_is_rejected() {
    let upstream = MockServer::start_async().await;
    let any = upstream
        .mock_async(|when, then| {
            when.any_request();
            then.status(200);
        })
        .await;
    let server = create_test_server(&upstream);

    let response = server.get("/proxmox-api-commands/node/pve1/start").await;

    response.assert_status_bad_request();
    response.assert_text("Wrong 'command' param");
    any.assert_hits_async(0).await;
}

#[tokio::test]
async fn test_warm_ticket_is_reused_across_requests() {
    let upstream = MockServer::start_async().await;
    let login = mock_login(&upstream).await;
    let command = upstream
        .mock_async(|when, then| {
            when.method(POST).path("/api2/json/nodes/pve1/status");
            then.status(200).body("{\"data\":null}");
        })
        .await;
    let server = create_test_server(&upstream);

    for _ in 0..3 {
        let response = server.get("/proxmox-api-commands/node/pve1/shutdown").await;
        response.assert_text("200\n\n{\"data\":null}");
    }

    login.assert_hits_async(1).await;
    command.assert_hits_async(3).await;
}

#[tokio::test]
async fn test_rejected_login_is_bad_request_with_message() {
    let upstream = MockServer::start_async().await;
    upstream
        .mock_async(|when, then| {
            when.method(POST).path(LOGIN_PATH);
            then.status(401).body("authentication failure");
        })
        .await;
    let command = upstream
        .mock_async(|when, then| {
            when.method(POST).path("/api2/json/nodes/pve1/status");
            then.status(200);
        })
        .await;
    let server = create_test_server(&upstream);

    let response = server.get("/proxmox-api-commands/node/pve1/reboot").await;

    response.assert_status_bad_request();
    response.assert_text("Error on login request, status=401");
    command.assert_hits_async(0).await;
}

#[tokio::test]
async fn test_unreachable_login_does_not_reveal_password() {
    // bind then drop to get a local port with nothing listening
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let mut options =
        GatewayOptions::for_upstream(Url::parse(&format!("http://{}", address)).unwrap());
    options.proxmox_password = "TOPSECRETPW".to_string();
    let state = Arc::new(AppState::new(options).unwrap());
    let server = TestServer::new(create_router(state)).unwrap();

    let response = server.get("/proxmox-api-commands/node/pve1/reboot").await;

    response.assert_status_bad_request();
    let body = response.text();
    assert!(body.starts_with("Error on login request: "));
    assert!(!body.contains("TOPSECRETPW"));
    assert!(!body.contains("password="));
}

// =============================================================================
// VM commands
// =============================================================================

#[tokio::test]
async fn test_vm_start_relays_upstream_error_in_body() {
    let upstream = MockServer::start_async().await;
    mock_login(&upstream).await;
    let command = upstream
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api2/json/nodes/pve1/qemu/100/status/start")
                .header("cookie", "PVEAuthCookie=T1")
                .header("csrfpreventiontoken", "C1");
            then.status(500).body("Error");
        })
        .await;
    let server = create_test_server(&upstream);

    let response = server.get("/proxmox-api-commands/pve1/vm/100/start").await;

    // the upstream status only shows up in the body
    response.assert_status_ok();
    response.assert_text("500\n\nError");
    command.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_vm_gzip_response_is_decoded() {
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(b"{\"data\":\"UPID:pve1\"}").unwrap();
    let compressed = encoder.finish().unwrap();

    let upstream = MockServer::start_async().await;
    mock_login(&upstream).await;
    upstream
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api2/json/nodes/pve1/qemu/100/status/stop");
            then.status(200)
                .header("content-encoding", "gzip")
                .body(compressed);
        })
        .await;
    let server = create_test_server(&upstream);

    let response = server.get("/proxmox-api-commands/pve1/vm/100/stop").await;

    response.assert_status_ok();
    response.assert_text("200\n\n{\"data\":\"UPID:pve1\"}");
}

#[tokio::test]
async fn test_vm_command_outside_whitelist_is_rejected() {
    let upstream = MockServer::start_async().await;
    let any = upstream
        .mock_async(|when, then| {
            when.any_request();
            then.status(200);
        })
        .await;
    let server = create_test_server(&upstream);

    let response = server.get("/proxmox-api-commands/pve1/vm/100/reboot").await;

    response.assert_status_bad_request();
    response.assert_text("Wrong 'command' param");
    any.assert_hits_async(0).await;
}

#[tokio::test]
async fn test_unreachable_upstream_is_generic_bad_request() {
    let upstream = MockServer::start_async().await;
    mock_login(&upstream).await;
    upstream
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api2/json/nodes/pve1/qemu/100/status/shutdown");
            then.status(200).delay(std::time::Duration::from_secs(2));
        })
        .await;
    let mut options = GatewayOptions::for_upstream(Url::parse(&upstream.base_url()).unwrap());
    options.request_timeout = std::time::Duration::from_millis(500);
    let state = Arc::new(AppState::new(options).unwrap());
    let server = TestServer::new(create_router(state)).unwrap();

    let response = server.get("/proxmox-api-commands/pve1/vm/100/shutdown").await;

    response.assert_status_bad_request();
    response.assert_text("Error on request");
}

// =============================================================================
// Server lifecycle
// =============================================================================

#[tokio::test]
async fn test_application_binds_ephemeral_port() {
    let options = GatewayOptions::for_upstream(Url::parse("https://pve.local:8006").unwrap());
    let application = Application::build(options).await.unwrap();
    assert_ne!(application.port(), 0);
}

#[tokio::test]
async fn test_command_survives_client_disconnect() {
    let upstream = MockServer::start_async().await;
    upstream
        .mock_async(|when, then| {
            when.method(POST).path(LOGIN_PATH);
            then.status(200)
                .delay(Duration::from_millis(500))
                .json_body(json!({"data": {"ticket": "T1", "CSRFPreventionToken": "C1"}}));
        })
        .await;
    let command = upstream
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api2/json/nodes/pve1/status")
                .query_param("command", "reboot");
            then.status(200).body("OK");
        })
        .await;
    let options = GatewayOptions::for_upstream(Url::parse(&upstream.base_url()).unwrap());
    let application = Application::build(options).await.unwrap();
    let port = application.port();
    tokio::spawn(application.run_until_stopped());

    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    stream
        .write_all(
            b"GET /proxmox-api-commands/node/pve1/reboot HTTP/1.1\r\nHost: localhost\r\n\r\n",
        )
        .await
        .unwrap();
    // hang up while the login is still pending
    tokio::time::sleep(Duration::from_millis(100)).await;
    drop(stream);

    tokio::time::sleep(Duration::from_secs(2)).await;
    command.assert_hits_async(1).await;
}
