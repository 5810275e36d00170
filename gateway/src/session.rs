// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Proxmox session ticket caching.
//!
//! A ticket is reused until the configured TTL elapses. The TTL is our own
//! assumption about the upstream session lifetime (the login response does
//! not carry one), so it should stay below the Proxmox ticket lifetime of
//! two hours.
//!
//! Expiry is checked lazily on each call. When several requests find the
//! ticket expired at once, the first one to take the write lock logs in and
//! the others reuse its result once the lock is released. That includes a
//! failure: requests queued behind a failed login get its error instead of
//! each trying again in turn.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::StatusCode;
use reqwest::Url;
use reqwest::header::{COOKIE, HeaderMap, HeaderName, HeaderValue};
use tokio::sync::RwLock;

use crate::configuration::GatewayOptions;
use crate::constants::{AUTH_COOKIE_NAME, CSRF_HEADER_NAME, LOGIN_PATH};
use crate::forwarding::{ForwardError, ForwardingClient, api_url};
use crate::models::{LoginResponse, SessionCredential};

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("Error on login request: {0}")]
    Transport(#[source] ForwardError),
    #[error("Error on login request, status={}", .status.as_u16())]
    Rejected { status: StatusCode, body: String },
    #[error("Error on parse login response: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("invalid proxmox host: {0}")]
    InvalidHost(String),
    #[error("ticket cannot be sent as a header")]
    InvalidCredential,
    /// Outcome of a login attempt shared by every request that waited on it.
    #[error(transparent)]
    Shared(Arc<AuthError>),
}

struct CachedSession {
    credential: SessionCredential,
    // `None` when the TTL does not fit in an `Instant`
    expires_at: Option<Instant>,
}

impl CachedSession {
    fn is_valid(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Instant::now() < expires_at,
            None => true, // No expiry = always valid
        }
    }
}

#[derive(Default)]
struct SessionState {
    session: Option<CachedSession>,
    // bumped once per login attempt, successful or not
    attempts: u64,
    last_failure: Option<Arc<AuthError>>,
}

pub struct SessionCache {
    client: Arc<ForwardingClient>,
    // carries the password in its query, never log it
    login_url: Url,
    request_timeout: Duration,
    ttl: Duration,
    state: RwLock<SessionState>,
}

impl SessionCache {
    pub fn new(client: Arc<ForwardingClient>, options: &GatewayOptions) -> Result<Self, AuthError> {
        let mut login_url = api_url(&options.proxmox_host, &LOGIN_PATH)
            .ok_or_else(|| AuthError::InvalidHost(options.proxmox_host.to_string()))?;
        login_url
            .query_pairs_mut()
            .append_pair("username", &options.proxmox_username)
            .append_pair("password", &options.proxmox_password);

        Ok(Self {
            client,
            login_url,
            request_timeout: options.request_timeout,
            ttl: options.authorization_ttl,
            state: RwLock::new(SessionState::default()),
        })
    }

    /// Returns the cookie and CSRF headers for the current ticket, logging in
    /// first if there is no ticket or it has expired.
    ///
    /// A failed login leaves the cache untouched.
    #[tracing::instrument(skip(self))]
    pub async fn get_auth_headers(&self) -> Result<HeaderMap, AuthError> {
        let credential = self.get_credential().await?;
        auth_headers(&credential)
    }

    /// Expiry of the cached ticket. `None` before the first successful login,
    /// or when the TTL is too large to represent.
    pub async fn expires_at(&self) -> Option<Instant> {
        self.state
            .read()
            .await
            .session
            .as_ref()
            .and_then(|cached| cached.expires_at)
    }

    async fn get_credential(&self) -> Result<SessionCredential, AuthError> {
        // Fast path: the cached ticket is still valid
        let attempts = {
            let state = self.state.read().await;
            if let Some(ref cached) = state.session
                && cached.is_valid()
            {
                return Ok(cached.credential.clone());
            }
            state.attempts
        };

        // Slow path: log in
        self.refresh(attempts).await
    }

    /// Logs in unless a login attempt finished while this caller waited for
    /// the write lock, in which case that attempt's outcome is returned.
    async fn refresh(&self, seen_attempts: u64) -> Result<SessionCredential, AuthError> {
        let mut state = self.state.write().await;

        // Double-check after acquiring write lock (a concurrent request may have logged in)
        if let Some(ref cached) = state.session
            && cached.is_valid()
        {
            return Ok(cached.credential.clone());
        }
        if state.attempts != seen_attempts
            && let Some(ref failure) = state.last_failure
        {
            return Err(AuthError::Shared(failure.clone()));
        }

        state.attempts = state.attempts.wrapping_add(1);
        state.last_failure = None;
        let credential = match self.login().await {
            Ok(credential) => credential,
            Err(e) => {
                let failure = Arc::new(e);
                state.last_failure = Some(failure.clone());
                return Err(AuthError::Shared(failure));
            }
        };

        tracing::debug!("[gateway] logged in, ticket valid for {:?}", self.ttl);

        state.session = Some(CachedSession {
            credential: credential.clone(),
            expires_at: Instant::now().checked_add(self.ttl),
        });

        Ok(credential)
    }

    async fn login(&self) -> Result<SessionCredential, AuthError> {
        let response = self
            .client
            .post(
                self.login_url.clone(),
                Vec::new(),
                &HeaderMap::new(),
                self.request_timeout,
            )
            .await
            .map_err(|e| {
                // `e` never carries the login URL, see `ForwardError`
                tracing::debug!("[gateway] login request failed: {:?}", e);
                AuthError::Transport(e)
            })?;

        let body = String::from_utf8_lossy(&response.body).into_owned();

        if response.status != StatusCode::OK {
            tracing::debug!(
                "[gateway] login rejected, status={}, body={}",
                response.status,
                body
            );
            return Err(AuthError::Rejected {
                status: response.status,
                body,
            });
        }

        let login: LoginResponse = serde_json::from_slice(&response.body).map_err(|e| {
            tracing::debug!("[gateway] unable to parse login response: {}", e);
            AuthError::Parse(e)
        })?;

        Ok(login.into())
    }
}

fn auth_headers(credential: &SessionCredential) -> Result<HeaderMap, AuthError> {
    let mut cookie =
        HeaderValue::from_str(&format!("{}={}", AUTH_COOKIE_NAME, credential.ticket))
            .map_err(|_| AuthError::InvalidCredential)?;
    cookie.set_sensitive(true);

    let mut token = HeaderValue::from_str(&credential.csrf_prevention_token)
        .map_err(|_| AuthError::InvalidCredential)?;
    token.set_sensitive(true);

    let mut headers = HeaderMap::with_capacity(2);
    headers.insert(COOKIE, cookie);
    headers.insert(HeaderName::from_static(CSRF_HEADER_NAME), token);
    Ok(headers)
}
