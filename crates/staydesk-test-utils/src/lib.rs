// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Staydesk integration tests.
//!
//! Provides mock adapters and a seeded temp-database harness for fast,
//! deterministic tests without a real gateway or document renderer.
//!
//! # Components
//!
//! - [`MockGateway`] - captures deliveries, fails on demand
//! - [`MockRenderer`] - hands out predictable document handles
//! - [`TestHarness`] - temp SQLite storage plus both mocks

pub mod fixtures;
pub mod harness;
pub mod mock_gateway;
pub mod mock_renderer;

pub use harness::TestHarness;
pub use mock_gateway::MockGateway;
pub use mock_renderer::MockRenderer;
