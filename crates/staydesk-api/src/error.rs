// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping from engine errors to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use staydesk_core::StaydeskError;
use tracing::error;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub retryable: bool,
}

/// Wrapper so handlers can return `Result<_, ApiError>` and use `?`.
#[derive(Debug)]
pub struct ApiError(pub StaydeskError);

impl From<StaydeskError> for ApiError {
    fn from(e: StaydeskError) -> Self {
        Self(e)
    }
}

pub fn status_for(e: &StaydeskError) -> StatusCode {
    match e {
        StaydeskError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        StaydeskError::NotFound { .. } => StatusCode::NOT_FOUND,
        StaydeskError::AlreadyResolved { .. }
        | StaydeskError::ActionInProgress { .. }
        | StaydeskError::InvalidTransition { .. } => StatusCode::CONFLICT,
        StaydeskError::Delivery { .. } | StaydeskError::Gateway(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() && status != StatusCode::BAD_GATEWAY {
            error!(error = %self.0, "request failed");
        }
        let body = ErrorResponse {
            error: self.0.to_string(),
            retryable: self.0.is_retryable(),
        };
        (status, Json(body)).into_response()
    }
}
