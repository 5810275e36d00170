// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

/// Commands accepted on `/proxmox-api-commands/node/{node}/{command}`.
pub const NODE_COMMANDS: [&str; 2] = ["shutdown", "reboot"];
/// Commands accepted on `/proxmox-api-commands/{node}/vm/{vm}/{command}`.
pub const VM_COMMANDS: [&str; 3] = ["start", "stop", "shutdown"];

pub const API_PREFIX: [&str; 2] = ["api2", "json"];
pub const LOGIN_PATH: [&str; 2] = ["access", "ticket"];

pub const AUTH_COOKIE_NAME: &str = "PVEAuthCookie";
pub const CSRF_HEADER_NAME: &str = "csrfpreventiontoken";
pub const ACCEPT_ENCODING_VALUE: &str = "gzip, deflate";

// Applied to every gateway response, including OPTIONS preflights.
pub const RESPONSE_HEADERS: [(&str, &str); 6] = [
    ("vary", "Origin"),
    (
        "cache-control",
        "no-transform, no-cache, no-store, must-revalidate",
    ),
    ("pragma", "no-cache"),
    ("access-control-allow-origin", "*"),
    ("access-control-allow-headers", "*"),
    ("access-control-allow-methods", "*"),
];

pub const FORWARDING_ERROR_MESSAGE: &str = "Error on request";
pub const WRONG_NODE_MESSAGE: &str = "Wrong 'node' param";
pub const WRONG_VM_MESSAGE: &str = "Wrong 'vm' param";
pub const WRONG_COMMAND_MESSAGE: &str = "Wrong 'command' param";
