// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Whitelist of commands the gateway is willing to forward.
//!
//! Matching is exact and case-sensitive. Anything not listed in
//! [`NODE_COMMANDS`] or [`VM_COMMANDS`] is rejected before any upstream
//! traffic happens.

use crate::constants::{NODE_COMMANDS, VM_COMMANDS};

pub fn is_valid_node_command(name: &str) -> bool {
    NODE_COMMANDS.contains(&name)
}

pub fn is_valid_vm_command(name: &str) -> bool {
    VM_COMMANDS.contains(&name)
}
