// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! REST surface over the Staydesk engine.
//!
//! JSON in, JSON out. Engine errors map to status codes in [`error`];
//! every error body is `{ "error": ..., "retryable": ... }`.

pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use server::{AppState, router, start_server};
