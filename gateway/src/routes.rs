// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! HTTP route handlers for the gateway.
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | GET | `/health` | [`health`] |
//! | GET | `/proxmox-api-commands/node/{node}/{command}` | [`node_command`] |
//! | GET | `/proxmox-api-commands/{node}/vm/{vm}/{command}` | [`vm_command`] |
//!
//! A forwarded command always answers `200 OK` with a `text/plain` body of
//! the form `"{upstream status}\n\n{upstream body}"`, whatever status the
//! upstream returned. Only validation, login and transport failures turn
//! into a `400`.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use reqwest::Url;
use serde_json::json;
use tracing::Instrument;

use crate::application::AppState;
use crate::commands::{is_valid_node_command, is_valid_vm_command};
use crate::constants::{WRONG_COMMAND_MESSAGE, WRONG_NODE_MESSAGE, WRONG_VM_MESSAGE};
use crate::errors::AppError;
use crate::forwarding::{UpstreamResponse, api_url};

/// Health check endpoint.
///
/// # Response
///
/// ```json
/// {"status": "ok"}
/// ```
pub async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Fallback for unknown paths, so the response middleware also covers them.
pub async fn not_found() -> impl IntoResponse {
    StatusCode::NOT_FOUND
}

/// Runs a whitelisted node command (`shutdown`, `reboot`) via
/// `POST /api2/json/nodes/{node}/status?command={command}`.
///
/// # Errors
///
/// - [`AppError::ValidationError`] - empty node or unknown command
/// - [`AppError::AuthError`] - login failed
/// - [`AppError::ForwardingError`] - the command call itself failed
#[tracing::instrument(skip(state))]
pub async fn node_command(
    State(state): State<Arc<AppState>>,
    Path((node, command)): Path<(String, String)>,
) -> Result<Response, AppError> {
    if node.is_empty() {
        return Err(AppError::ValidationError(WRONG_NODE_MESSAGE.to_string()));
    }
    if !is_valid_node_command(&command) {
        return Err(AppError::ValidationError(WRONG_COMMAND_MESSAGE.to_string()));
    }

    let mut url = upstream_url(&state, &["nodes", node.as_str(), "status"])?;
    url.query_pairs_mut().append_pair("command", &command);

    forward(state, url).await
}

/// Runs a whitelisted VM command (`start`, `stop`, `shutdown`) via
/// `POST /api2/json/nodes/{node}/qemu/{vm}/status/{command}`.
///
/// # Errors
///
/// Same as [`node_command`], plus a validation error for an empty VM id.
#[tracing::instrument(skip(state))]
pub async fn vm_command(
    State(state): State<Arc<AppState>>,
    Path((node, vm, command)): Path<(String, String, String)>,
) -> Result<Response, AppError> {
    if node.is_empty() {
        return Err(AppError::ValidationError(WRONG_NODE_MESSAGE.to_string()));
    }
    if vm.is_empty() {
        return Err(AppError::ValidationError(WRONG_VM_MESSAGE.to_string()));
    }
    if !is_valid_vm_command(&command) {
        return Err(AppError::ValidationError(WRONG_COMMAND_MESSAGE.to_string()));
    }

    let url = upstream_url(
        &state,
        &["nodes", node.as_str(), "qemu", vm.as_str(), "status", command.as_str()],
    )?;

    forward(state, url).await
}

fn upstream_url(state: &AppState, segments: &[&str]) -> Result<Url, AppError> {
    api_url(&state.options.proxmox_host, segments).ok_or_else(|| {
        AppError::ConfigError(format!(
            "invalid proxmox host: {}",
            state.options.proxmox_host
        ))
    })
}

/// Logs in (if needed) and posts the command on a detached task, so a caller
/// that hangs up early does not cancel a command already accepted. The task
/// ends on its own when the upstream call completes or times out.
async fn forward(state: Arc<AppState>, url: Url) -> Result<Response, AppError> {
    let response = tokio::spawn(async move {
        let headers = state.sessions.get_auth_headers().await.map_err(|e| {
            tracing::error!("[gateway] failed to get auth headers: {}", e);
            e
        })?;

        let response = state
            .client
            .post(url, Vec::new(), &headers, state.options.request_timeout)
            .await
            .map_err(|e| {
                tracing::error!("[gateway] command request failed: {}", e);
                e
            })?;

        Ok::<_, AppError>(response)
    }
    .in_current_span())
    .await
    .map_err(|e| {
        tracing::error!("[gateway] forwarding task failed: {:?}", e);
        AppError::InternalServerError
    })??;

    tracing::debug!("[gateway] upstream answered {}", response.status);

    Ok((
        [(CONTENT_TYPE, "text/plain; charset=utf-8")],
        relay_body(response),
    )
        .into_response())
}

fn relay_body(response: UpstreamResponse) -> Vec<u8> {
    let mut body = format!("{}\n\n", response.status.as_u16()).into_bytes();
    body.extend_from_slice(&response.body);
    body
}
