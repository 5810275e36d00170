// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::fmt;

use serde::Deserialize;
use zeroize::ZeroizeOnDrop;

/// Body of `POST /api2/json/access/ticket`.
#[derive(Deserialize)]
pub struct LoginResponse {
    pub data: LoginData,
}

#[derive(Deserialize, ZeroizeOnDrop)]
pub struct LoginData {
    pub ticket: String,
    #[serde(rename = "CSRFPreventionToken")]
    pub csrf_prevention_token: String,
}

/// Ticket and anti-forgery token issued by one successful login.
#[derive(Clone, PartialEq, Eq, ZeroizeOnDrop)]
pub struct SessionCredential {
    pub ticket: String,
    pub csrf_prevention_token: String,
}

impl From<LoginResponse> for SessionCredential {
    fn from(response: LoginResponse) -> Self {
        Self {
            ticket: response.data.ticket.clone(),
            csrf_prevention_token: response.data.csrf_prevention_token.clone(),
        }
    }
}

// Custom Debug implementation to prevent accidental logging of sensitive data
impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredential")
            .field("ticket", &"[REDACTED]")
            .field("csrf_prevention_token", &"[REDACTED]")
            .finish()
    }
}
