// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Staydesk notification engine.

use std::time::Duration;

use thiserror::Error;

use crate::types::{DeliveryFailure, MessageState};

/// The primary error type used across all Staydesk crates.
#[derive(Debug, Error)]
pub enum StaydeskError {
    /// Configuration errors (invalid values discovered after loading).
    #[error("configuration error: {0}")]
    Config(String),

    /// Caller input rejected before anything is persisted.
    #[error("validation error: {0}")]
    Validation(String),

    /// A referenced record does not exist.
    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },

    /// The scheduled message already left the `scheduled` state.
    #[error("scheduled message `{id}` is already {state}")]
    AlreadyResolved { id: String, state: MessageState },

    /// Another actor holds the claim on this record.
    #[error("an action is already in progress for `{id}`")]
    ActionInProgress { id: String },

    /// A lifecycle transition was attempted from a state that does not allow it.
    #[error("cannot {action} {entity} `{id}` while it is {from}")]
    InvalidTransition {
        entity: &'static str,
        id: String,
        from: String,
        action: &'static str,
    },

    /// A synchronous dispatch ended with the record in `failed`.
    #[error("delivery of message `{id}` failed: {failure}")]
    Delivery { id: String, failure: DeliveryFailure },

    /// Gateway errors surfaced outside of scheduled-message dispatch.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Document renderer errors.
    #[error("document renderer error: {message}")]
    Renderer {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StaydeskError {
    /// Shorthand for [`StaydeskError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Whether repeating the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ActionInProgress { .. } => true,
            Self::Delivery { failure, .. } => failure.retryable,
            Self::Gateway(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Errors reported by a delivery gateway, classified for retry decisions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Transport-level failure (connect, timeout, reset).
    #[error("network error: {0}")]
    Network(String),

    /// The gateway asked us to slow down.
    #[error("rate limited by gateway")]
    RateLimited { retry_after: Option<Duration> },

    /// The gateway is temporarily unable to accept messages.
    #[error("gateway unavailable: {0}")]
    Unavailable(String),

    /// The recipient address is malformed or unreachable.
    #[error("invalid address `{0}`")]
    InvalidAddress(String),

    /// The gateway refused the message for a non-transient reason.
    #[error("rejected by gateway: {0}")]
    Rejected(String),
}

impl GatewayError {
    /// Network, rate-limit and availability failures may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::RateLimited { .. } | Self::Unavailable(_)
        )
    }
}
