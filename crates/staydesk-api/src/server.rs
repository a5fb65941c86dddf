// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! API server built on axum.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use staydesk_config::model::ApiConfig;
use staydesk_core::{StaydeskError, StorageAdapter};
use staydesk_documents::HtmlRenderer;
use staydesk_engine::Engine;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers;

/// Shared state for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    /// Used by the health endpoint.
    pub storage: Arc<dyn StorageAdapter>,
    /// Serves rendered contracts under `/documents` when set.
    pub documents: Option<Arc<HtmlRenderer>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route(
            "/v1/templates",
            get(handlers::list_templates).post(handlers::create_template),
        )
        .route(
            "/v1/templates/{id}",
            get(handlers::get_template).put(handlers::update_template),
        )
        .route(
            "/v1/templates/{id}/trigger",
            put(handlers::attach_trigger).delete(handlers::detach_trigger),
        )
        .route("/v1/templates/{id}/preview", post(handlers::preview_template))
        .route(
            "/v1/scheduled",
            get(handlers::list_scheduled).post(handlers::schedule_message),
        )
        .route("/v1/scheduled/{id}/cancel", post(handlers::cancel_message))
        .route("/v1/scheduled/{id}/send", post(handlers::send_message_now))
        .route("/v1/messages", post(handlers::send_adhoc))
        .route("/v1/contracts", post(handlers::generate_contract))
        .route("/v1/contracts/{id}", get(handlers::get_contract))
        .route("/v1/contracts/{id}/signed", post(handlers::contract_signed))
        .route("/v1/contracts/{id}/regenerate", post(handlers::regenerate_contract))
        .route("/v1/contracts/{id}/retry", post(handlers::retry_contract))
        .route("/v1/contracts/{id}/expire", post(handlers::expire_contract))
        .route("/v1/contracts/{id}/download", get(handlers::download_contract))
        .route("/v1/invitations", post(handlers::invite_contact))
        .route("/v1/events/reservation", post(handlers::reservation_event))
        .route("/v1/events/verification", post(handlers::verification_event))
        .route("/v1/events/guest", post(handlers::guest_event))
        .route("/v1/events/property", post(handlers::property_event))
        .route("/documents/{handle}", get(handlers::get_document))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API until `cancel` fires.
pub async fn start_server(
    config: &ApiConfig,
    state: AppState,
    cancel: CancellationToken,
) -> Result<(), StaydeskError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| StaydeskError::Config(format!("failed to bind API to {addr}: {e}")))?;

    info!(%addr, "API server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| StaydeskError::Internal(format!("API server error: {e}")))?;

    info!("API server stopped");
    Ok(())
}
