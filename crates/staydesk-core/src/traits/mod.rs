// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the collaborators the engine talks to.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod gateway;
pub mod renderer;
pub mod storage;

pub use adapter::PluginAdapter;
pub use gateway::GatewayAdapter;
pub use renderer::DocumentRenderer;
pub use storage::{
    ContractStore, DirectoryStore, InvitationStore, ScheduleStore, StorageAdapter, TemplateStore,
};
