// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! # Proxmox Gateway
//!
//! A thin authenticated gateway in front of the Proxmox VE API.
//!
//! Callers issue plain `GET` requests naming a node (and VM) and a command.
//! The gateway checks the command against a whitelist, logs in to Proxmox
//! when its cached ticket has expired, and forwards the command as an
//! authenticated `POST`, relaying the upstream status and body.
//!
//! ## Architecture
//!
//! ```text
//! Client -> HTTP API -> Gateway (this crate) -> HTTPS -> Proxmox VE API
//!                          |
//!                          +-> SessionCache (ticket + CSRF token, TTL)
//! ```
//!
//! ## Modules
//!
//! - [`application`]: Axum router, response headers middleware, server lifecycle
//! - [`commands`]: Whitelist of node and VM commands
//! - [`configuration`]: CLI/environment options with clap
//! - [`constants`]: Command lists, header names, fixed messages
//! - [`errors`]: Application error type with HTTP response mapping
//! - [`forwarding`]: Outbound HTTP client with timeouts and gzip handling
//! - [`models`]: Login response and session credential types
//! - [`routes`]: HTTP route handlers (health, node and VM commands)
//! - [`session`]: Ticket cache with expiration-driven login
//!
//! ## Usage
//!
//! ```bash
//! proxmox-gateway --proxmox-host https://pve.local:8006 \
//!     --proxmox-username api@pve --proxmox-password '...' \
//!     --request-timeout 10s --authorization-ttl 1h
//! ```
//!
//! ## Security Considerations
//!
//! - Upstream TLS is verified unless `--insecure-skip-verify` is given
//! - Tickets are zeroized on drop and redacted from `Debug` output
//! - Commands outside the whitelist never reach Proxmox
//! - Login failures are returned to the caller verbatim, forwarding failures
//!   only as a generic message

pub mod application;
pub mod commands;
pub mod configuration;
pub mod constants;
pub mod errors;
pub mod forwarding;
pub mod models;
pub mod routes;
pub mod session;
