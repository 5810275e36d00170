// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Outbound HTTP calls to the Proxmox VE API.
//!
//! [`ForwardingClient`] wraps a shared [`reqwest::Client`] and adds the
//! behaviour the gateway relies on for every upstream call:
//!
//! - caller-supplied headers are appended as given, duplicates included
//! - `Accept-Encoding: gzip, deflate` is always advertised
//! - the timeout covers the whole round trip, body included
//! - `Content-Encoding: gzip` responses are decoded before they are returned
//!
//! No retries are attempted. A decode failure is logged and the raw body is
//! returned instead, so a misbehaving upstream never hides its status code.

use std::io::{Read, Write};
use std::time::Duration;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use reqwest::header::{ACCEPT_ENCODING, CONTENT_ENCODING, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, StatusCode, Url};

use crate::constants::{ACCEPT_ENCODING_VALUE, API_PREFIX};

#[derive(thiserror::Error, Debug)]
pub enum ForwardError {
    #[error("upstream request timed out")]
    Timeout,
    #[error("upstream request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("unable to gzip request body: {0}")]
    Compression(#[source] std::io::Error),
}

// The request URL is dropped from the error: the login URL carries the
// password in its query, and these errors end up in logs and responses.
impl From<reqwest::Error> for ForwardError {
    fn from(source: reqwest::Error) -> Self {
        if source.is_timeout() {
            ForwardError::Timeout
        } else {
            ForwardError::Transport(source.without_url())
        }
    }
}

/// Status and (decoded) body of an upstream response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

pub struct ForwardingClient {
    client: reqwest::Client,
}

impl ForwardingClient {
    /// Builds the shared transport.
    ///
    /// With `insecure_skip_verify` set, any certificate presented by the
    /// upstream is accepted. Proxmox ships with a self-signed certificate,
    /// so deployments that never replaced it need this.
    pub fn new(insecure_skip_verify: bool) -> Result<Self, ForwardError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(insecure_skip_verify)
            .build()?;

        Ok(Self { client })
    }

    #[tracing::instrument(skip(self, headers), fields(url = %url.path()))]
    pub async fn get(
        &self,
        url: Url,
        headers: &HeaderMap,
        timeout: Duration,
    ) -> Result<UpstreamResponse, ForwardError> {
        let request = self.client.request(Method::GET, url);
        self.send(request, headers, timeout).await
    }

    #[tracing::instrument(skip(self, body, headers), fields(url = %url.path()))]
    pub async fn post(
        &self,
        url: Url,
        body: Vec<u8>,
        headers: &HeaderMap,
        timeout: Duration,
    ) -> Result<UpstreamResponse, ForwardError> {
        let request = self.client.request(Method::POST, url).body(body);
        self.send(request, headers, timeout).await
    }

    /// Like [`post`](Self::post), but sends `body` gzip-compressed with
    /// `Content-Encoding: gzip`.
    ///
    /// # Errors
    ///
    /// [`ForwardError::Compression`] if the body cannot be compressed. No
    /// request is sent in that case.
    #[tracing::instrument(skip(self, body, headers), fields(url = %url.path()))]
    pub async fn post_gzip(
        &self,
        url: Url,
        body: &[u8],
        headers: &HeaderMap,
        timeout: Duration,
    ) -> Result<UpstreamResponse, ForwardError> {
        let compressed = gzip(body).map_err(ForwardError::Compression)?;
        let request = self
            .client
            .request(Method::POST, url)
            .header(CONTENT_ENCODING, HeaderValue::from_static("gzip"))
            .body(compressed);
        self.send(request, headers, timeout).await
    }

    async fn send(
        &self,
        mut request: RequestBuilder,
        headers: &HeaderMap,
        timeout: Duration,
    ) -> Result<UpstreamResponse, ForwardError> {
        // `header` appends, so repeated names reach the upstream unchanged
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request
            .header(
                ACCEPT_ENCODING,
                HeaderValue::from_static(ACCEPT_ENCODING_VALUE),
            )
            .timeout(timeout)
            .send()
            .await
            .map_err(ForwardError::from)
            .inspect_err(|e| tracing::debug!("[gateway] upstream send failed: {:?}", e))?;

        let status = response.status();
        let gzipped = is_gzip(response.headers().get(CONTENT_ENCODING));
        let body = response.bytes().await?.to_vec();

        tracing::trace!(
            "[gateway] upstream responded {} ({} bytes, gzip: {})",
            status,
            body.len(),
            gzipped
        );

        let body = if gzipped { gunzip_lenient(body) } else { body };

        Ok(UpstreamResponse { status, body })
    }
}

/// Appends `segments` below `/api2/json` of the configured Proxmox host.
///
/// Each segment is percent-encoded, so a path parameter can never add
/// segments or a query of its own.
pub fn api_url(host: &Url, segments: &[&str]) -> Option<Url> {
    let mut url = host.clone();
    url.set_query(None);
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .extend(API_PREFIX)
        .extend(segments);
    Some(url)
}

fn is_gzip(content_encoding: Option<&HeaderValue>) -> bool {
    content_encoding
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("gzip"))
}

fn gzip(body: &[u8]) -> Result<Vec<u8>, std::io::Error> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(body.len()), Compression::default());
    encoder.write_all(body)?;
    encoder.finish()
}

fn gunzip_lenient(body: Vec<u8>) -> Vec<u8> {
    let mut decoded = Vec::new();
    match GzDecoder::new(body.as_slice()).read_to_end(&mut decoded) {
        Ok(_) => decoded,
        Err(e) => {
            tracing::warn!("[gateway] unable to gunzip upstream body, relaying it as-is: {}", e);
            body
        }
    }
}
