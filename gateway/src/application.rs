// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::sync::Arc;

use axum::Router;
use axum::extract::Request;
use axum::http::header::{HeaderName, HeaderValue};
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::serve::Serve;
use tokio::net::TcpListener;

use crate::configuration::GatewayOptions;
use crate::constants::RESPONSE_HEADERS;
use crate::errors::AppError;
use crate::forwarding::ForwardingClient;
use crate::routes;
use crate::session::SessionCache;

/// Shared by every request for the lifetime of the process.
pub struct AppState {
    pub options: GatewayOptions,
    pub client: Arc<ForwardingClient>,
    pub sessions: SessionCache,
}

impl AppState {
    pub fn new(options: GatewayOptions) -> Result<Self, AppError> {
        if options.insecure_skip_verify {
            tracing::warn!(
                "[gateway] TLS verification disabled for {}",
                options.proxmox_host
            );
        }

        let client = Arc::new(
            ForwardingClient::new(options.insecure_skip_verify)
                .map_err(|e| AppError::ConfigError(e.to_string()))?,
        );
        let sessions = SessionCache::new(client.clone(), &options)
            .map_err(|e| AppError::ConfigError(e.to_string()))?;

        Ok(Self {
            options,
            client,
            sessions,
        })
    }
}

pub struct Application {
    port: u16,
    server: Serve<TcpListener, Router, Router>,
}

impl Application {
    pub async fn build(options: GatewayOptions) -> Result<Self, AppError> {
        let address = format!("{}:{}", options.host, options.port);
        let listener = TcpListener::bind(address).await?;
        let host = options.host.clone();
        let state = Arc::new(AppState::new(options)?);
        let server = run(listener, state)?;
        let port = server.local_addr()?.port();

        tracing::info!("[gateway] listening at http://{}:{}", host, port);

        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serves until SIGINT or SIGTERM, then drains in-flight requests.
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.with_graceful_shutdown(shutdown_signal()).await
    }
}

pub fn run(
    listener: TcpListener,
    state: Arc<AppState>,
) -> Result<Serve<TcpListener, Router, Router>, std::io::Error> {
    let app = create_router(state);
    Ok(axum::serve(listener, app))
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route(
            "/proxmox-api-commands/node/{node}/{command}",
            get(routes::node_command),
        )
        .route(
            "/proxmox-api-commands/{node}/vm/{vm}/{command}",
            get(routes::vm_command),
        )
        .fallback(routes::not_found)
        .with_state(state)
        .layer(middleware::from_fn(response_headers))
}

/// Adds the CORS and no-cache headers to every response. `OPTIONS` requests
/// are answered with `204 No Content` without reaching a handler.
async fn response_headers(request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    for (name, value) in RESPONSE_HEADERS {
        headers.append(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }

    response
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("[gateway] unable to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("[gateway] unable to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("[gateway] graceful shutdown");
}
