// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery gateways for Staydesk.
//!
//! [`HttpGateway`] talks to an SMS/email/WhatsApp relay over HTTP.
//! [`DryRunGateway`] stands in when no relay is configured.

pub mod client;
pub mod dry_run;
pub mod wire;

use std::sync::Arc;

use staydesk_config::model::RelayConfig;
use staydesk_core::{GatewayAdapter, StaydeskError};
use tracing::warn;

pub use client::HttpGateway;
pub use dry_run::DryRunGateway;

/// The HTTP gateway when an endpoint is configured, the dry-run gateway otherwise.
pub fn gateway_from_config(config: &RelayConfig) -> Result<Arc<dyn GatewayAdapter>, StaydeskError> {
    if config.endpoint.is_none() {
        warn!("relay.endpoint not set; messages will be logged, not sent");
        return Ok(Arc::new(DryRunGateway));
    }
    Ok(Arc::new(HttpGateway::new(config)?))
}
