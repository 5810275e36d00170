// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};

use crate::constants::FORWARDING_ERROR_MESSAGE;
use crate::forwarding::ForwardError;
use crate::session::AuthError;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("validation error: {0}")]
    ValidationError(String),
    #[error(transparent)]
    AuthError(#[from] AuthError),
    #[error("forwarding error: {0}")]
    ForwardingError(#[from] ForwardError),
    #[error("configuration error: {0}")]
    ConfigError(String),
    #[error("internal server error")]
    InternalServerError,
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Login failures are shown to the caller as-is, forwarding failures only
        // generically; the cause of the latter is logged where it happens.
        let (status, message) = match self {
            Self::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::AuthError(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            Self::ForwardingError(_) => (
                StatusCode::BAD_REQUEST,
                FORWARDING_ERROR_MESSAGE.to_string(),
            ),
            Self::ConfigError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            Self::InternalServerError | Self::IoError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error".to_string(),
            ),
        };

        (
            status,
            [(CONTENT_TYPE, "text/plain; charset=utf-8")],
            message,
        )
            .into_response()
    }
}
