// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound message gateway (email / sms / whatsapp transport).

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::traits::adapter::PluginAdapter;
use crate::types::Delivery;

/// Sends one message over one channel.
///
/// Implementations classify every failure into a [`GatewayError`] so the
/// dispatcher can tell retryable outcomes from terminal ones. A single call
/// is a single attempt; retrying is the operator's decision.
#[async_trait]
pub trait GatewayAdapter: PluginAdapter {
    async fn send(&self, delivery: &Delivery) -> Result<(), GatewayError>;
}
