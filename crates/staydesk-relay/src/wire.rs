// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relay request and error payloads.

use serde::{Deserialize, Serialize};
use staydesk_core::types::{Channel, Delivery};

/// Body of `POST /v1/messages`.
#[derive(Debug, Clone, Serialize)]
pub struct SendRequest<'a> {
    pub channel: Channel,
    pub to: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<&'a str>,
    pub body: &'a str,
}

impl<'a> From<&'a Delivery> for SendRequest<'a> {
    fn from(d: &'a Delivery) -> Self {
        Self {
            channel: d.channel,
            to: &d.address,
            subject: d.subject.as_deref(),
            body: &d.body,
        }
    }
}

/// Error envelope returned by the relay on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}
