// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the message relay.
//!
//! [`HttpGateway`] posts one delivery per request and classifies every
//! failure so the dispatcher can tell transient errors from permanent ones.
//! It never retries on its own.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use staydesk_config::model::RelayConfig;
use staydesk_core::types::{AdapterType, Delivery, HealthStatus};
use staydesk_core::{GatewayAdapter, GatewayError, PluginAdapter, StaydeskError};
use tracing::debug;

use crate::wire::{ErrorResponse, SendRequest};

#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpGateway {
    /// Build a gateway for the configured endpoint. Fails if none is set.
    pub fn new(config: &RelayConfig) -> Result<Self, StaydeskError> {
        let endpoint = config
            .endpoint
            .as_deref()
            .ok_or_else(|| StaydeskError::Config("relay.endpoint is not set".into()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StaydeskError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

#[async_trait]
impl PluginAdapter for HttpGateway {
    fn name(&self) -> &str {
        "http-relay"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Gateway
    }

    async fn health_check(&self) -> Result<HealthStatus, StaydeskError> {
        let url = format!("{}/health", self.base_url);
        Ok(match self.request(self.client.get(&url)).send().await {
            Ok(resp) if resp.status().is_success() => HealthStatus::Healthy,
            Ok(resp) => HealthStatus::Degraded(format!("relay returned {}", resp.status())),
            Err(e) => HealthStatus::Unhealthy(format!("relay unreachable: {e}")),
        })
    }

    async fn shutdown(&self) -> Result<(), StaydeskError> {
        Ok(())
    }
}

#[async_trait]
impl GatewayAdapter for HttpGateway {
    async fn send(&self, delivery: &Delivery) -> Result<(), GatewayError> {
        let url = format!("{}/v1/messages", self.base_url);
        let response = self
            .request(self.client.post(&url))
            .json(&SendRequest::from(delivery))
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status();
        debug!(%status, channel = %delivery.channel, "relay responded");
        if status.is_success() {
            return Ok(());
        }

        let retry_after = retry_after(response.headers());
        let body = response.text().await.unwrap_or_default();
        Err(classify(status, retry_after, &body, &delivery.address))
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Map a non-2xx relay response to a gateway error.
fn classify(
    status: StatusCode,
    retry_after: Option<Duration>,
    body: &str,
    address: &str,
) -> GatewayError {
    let detail = serde_json::from_str::<ErrorResponse>(body).ok().map(|r| r.error);
    let message = match &detail {
        Some(d) if !d.message.is_empty() => d.message.clone(),
        _ => format!("relay returned {status}"),
    };

    if status == StatusCode::TOO_MANY_REQUESTS {
        return GatewayError::RateLimited { retry_after };
    }
    if status.is_server_error() {
        return GatewayError::Unavailable(message);
    }
    let invalid_address = detail.as_ref().is_some_and(|d| d.code == "invalid_address");
    if invalid_address
        && matches!(status, StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY)
    {
        return GatewayError::InvalidAddress(address.to_string());
    }
    GatewayError::Rejected(message)
}
