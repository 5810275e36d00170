// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::fmt;
use std::time::Duration;

use clap::{ArgAction, Parser};
use reqwest::Url;

#[derive(Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct GatewayOptions {
    #[arg(long, default_value = "0.0.0.0", env("HTTP_HOST"))]
    pub host: String,
    #[arg(long, default_value = "8080", env("PORT"))]
    pub port: u16,
    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, default_value = "info", env("LOGGER_LEVEL"))]
    pub log_level: String,
    /// Base URL of the Proxmox VE API, e.g. `https://pve.local:8006`.
    #[arg(long, env("PROXMOX_HOST"))]
    pub proxmox_host: Url,
    #[arg(long, env("PROXMOX_USERNAME"))]
    pub proxmox_username: String,
    #[arg(long, env("PROXMOX_PASSWORD"), hide_env_values = true)]
    pub proxmox_password: String,
    /// Deadline for every upstream call (login and commands), e.g. `10s`.
    #[arg(long, env("REQUEST_TIMEOUT"), value_parser = humantime::parse_duration)]
    pub request_timeout: Duration,
    /// How long a login ticket is reused before logging in again, e.g. `1h`.
    #[arg(long, env("AUTHORIZATION_TTL"), value_parser = humantime::parse_duration)]
    pub authorization_ttl: Duration,
    /// Accept any certificate presented by the Proxmox host.
    #[arg(long, default_value = "false", env("PROXMOX_INSECURE_SKIP_VERIFY"), action = ArgAction::SetTrue)]
    pub insecure_skip_verify: bool,
}

impl GatewayOptions {
    /// Options pointing at `proxmox_host` with short timeouts, for tests.
    pub fn for_upstream(proxmox_host: Url) -> Self {
        GatewayOptions {
            host: "127.0.0.1".to_string(),
            port: 0,
            log_level: "debug".to_string(),
            proxmox_host,
            proxmox_username: "api".to_string(),
            proxmox_password: "secret".to_string(),
            request_timeout: Duration::from_secs(5),
            authorization_ttl: Duration::from_secs(60),
            insecure_skip_verify: false,
        }
    }
}

// Custom Debug implementation to keep the upstream password out of the logs
impl fmt::Debug for GatewayOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("proxmox_host", &self.proxmox_host.as_str())
            .field("proxmox_username", &self.proxmox_username)
            .field("proxmox_password", &"[REDACTED]")
            .field("request_timeout", &self.request_timeout)
            .field("authorization_ttl", &self.authorization_ttl)
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .finish()
    }
}
