// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock delivery gateway for deterministic testing.
//!
//! `MockGateway` implements `GatewayAdapter`, records every delivery it
//! accepts, and returns scripted errors for chosen channels or addresses.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use staydesk_core::traits::adapter::PluginAdapter;
use staydesk_core::traits::gateway::GatewayAdapter;
use staydesk_core::types::{AdapterType, Channel, Delivery, HealthStatus};
use staydesk_core::{GatewayError, StaydeskError};

/// A mock gateway for testing.
///
/// Failure rules are checked in order: one-shot errors queued with
/// `fail_next()`, then per-address, then per-channel rules.
#[derive(Default)]
pub struct MockGateway {
    delivered: Mutex<Vec<Delivery>>,
    attempts: Mutex<usize>,
    next_errors: Mutex<VecDeque<GatewayError>>,
    by_address: Mutex<HashMap<String, GatewayError>>,
    by_channel: Mutex<HashMap<Channel, GatewayError>>,
    delay: Mutex<Option<Duration>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next send with `error`, whatever it is.
    pub async fn fail_next(&self, error: GatewayError) {
        self.next_errors.lock().await.push_back(error);
    }

    /// Fail every send to `address`.
    pub async fn fail_address(&self, address: &str, error: GatewayError) {
        self.by_address.lock().await.insert(address.to_string(), error);
    }

    /// Fail every send on `channel`.
    pub async fn fail_channel(&self, channel: Channel, error: GatewayError) {
        self.by_channel.lock().await.insert(channel, error);
    }

    /// Remove all failure rules.
    pub async fn heal(&self) {
        self.next_errors.lock().await.clear();
        self.by_address.lock().await.clear();
        self.by_channel.lock().await.clear();
    }

    /// Hold every send for `delay` before answering.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.lock().await = Some(delay);
    }

    /// Deliveries the gateway accepted, in arrival order.
    pub async fn delivered(&self) -> Vec<Delivery> {
        self.delivered.lock().await.clone()
    }

    pub async fn delivered_count(&self) -> usize {
        self.delivered.lock().await.len()
    }

    /// Every send call, accepted or not.
    pub async fn attempts(&self) -> usize {
        *self.attempts.lock().await
    }
}

#[async_trait]
impl PluginAdapter for MockGateway {
    fn name(&self) -> &str {
        "mock-gateway"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Gateway
    }

    async fn health_check(&self) -> Result<HealthStatus, StaydeskError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), StaydeskError> {
        Ok(())
    }
}

#[async_trait]
impl GatewayAdapter for MockGateway {
    async fn send(&self, delivery: &Delivery) -> Result<(), GatewayError> {
        *self.attempts.lock().await += 1;

        let delay = *self.delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.next_errors.lock().await.pop_front() {
            return Err(error);
        }
        if let Some(error) = self.by_address.lock().await.get(&delivery.address) {
            return Err(error.clone());
        }
        if let Some(error) = self.by_channel.lock().await.get(&delivery.channel) {
            return Err(error.clone());
        }

        self.delivered.lock().await.push(delivery.clone());
        Ok(())
    }
}
