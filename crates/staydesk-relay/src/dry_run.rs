// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway that logs deliveries instead of sending them.

use async_trait::async_trait;
use staydesk_core::types::{AdapterType, Delivery, HealthStatus};
use staydesk_core::{GatewayAdapter, GatewayError, PluginAdapter, StaydeskError};
use tracing::info;

/// Used when no relay endpoint is configured. Every send succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunGateway;

#[async_trait]
impl PluginAdapter for DryRunGateway {
    fn name(&self) -> &str {
        "dry-run"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Gateway
    }

    async fn health_check(&self) -> Result<HealthStatus, StaydeskError> {
        Ok(HealthStatus::Degraded("no relay endpoint configured".into()))
    }

    async fn shutdown(&self) -> Result<(), StaydeskError> {
        Ok(())
    }
}

#[async_trait]
impl GatewayAdapter for DryRunGateway {
    async fn send(&self, delivery: &Delivery) -> Result<(), GatewayError> {
        info!(
            channel = %delivery.channel,
            to = %delivery.address,
            subject = delivery.subject.as_deref(),
            body_len = delivery.body.len(),
            "dry run: delivery not sent"
        );
        Ok(())
    }
}
