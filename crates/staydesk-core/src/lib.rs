// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Staydesk notification engine.
//!
//! This crate provides the domain types, error types, and adapter traits
//! shared by every other crate in the workspace. Gateways, renderers, and
//! storage backends implement the traits defined here.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{GatewayError, StaydeskError};
pub use types::{AdapterType, HealthStatus};

pub use traits::{
    ContractStore, DirectoryStore, DocumentRenderer, GatewayAdapter, InvitationStore,
    PluginAdapter, ScheduleStore, StorageAdapter, TemplateStore,
};
