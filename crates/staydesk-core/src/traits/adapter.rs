// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity and health shared by gateways, renderers, and storage.

use async_trait::async_trait;

use crate::error::StaydeskError;
use crate::types::{AdapterType, HealthStatus};

/// Common surface of every backend the engine talks to.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Short name used in logs, e.g. `sqlite` or `http-relay`.
    fn name(&self) -> &str;

    fn version(&self) -> semver::Version;

    fn adapter_type(&self) -> AdapterType;

    /// Reported by `GET /health` for storage.
    async fn health_check(&self) -> Result<HealthStatus, StaydeskError>;

    /// Release connections and flush pending work.
    async fn shutdown(&self) -> Result<(), StaydeskError>;
}
