// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use staydesk_core::types::{
    Contact, Contract, DocumentHandle, DocumentRef, Guest, HealthStatus, MessageTemplate,
    Property, Reservation, ScheduledMessage, TemplateDraft, TriggerRule,
};
use staydesk_core::{PluginAdapter, StaydeskError};
use staydesk_engine::contract::ContractDelivery;
use staydesk_engine::fanout::FanoutOutcome;
use staydesk_engine::scheduler::ScheduleResult;
use staydesk_engine::templates::Preview;

use crate::error::ApiError;
use crate::server::AppState;

type ApiResult<T> = Result<Json<T>, ApiError>;

// --- Health ---

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// GET /health
pub async fn get_health(State(state): State<AppState>) -> Response {
    let (code, status, detail) = match state.storage.health_check().await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "healthy", None),
        Ok(HealthStatus::Degraded(d)) => (StatusCode::OK, "degraded", Some(d)),
        Ok(HealthStatus::Unhealthy(d)) => (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", Some(d)),
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", Some(e.to_string())),
    };
    let body = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        detail,
    };
    (code, Json(body)).into_response()
}

// --- Templates ---

#[derive(Debug, Deserialize)]
pub struct TemplateQuery {
    #[serde(default)]
    pub property_id: Option<String>,
}

/// GET /v1/templates
pub async fn list_templates(
    State(state): State<AppState>,
    Query(q): Query<TemplateQuery>,
) -> ApiResult<Vec<MessageTemplate>> {
    Ok(Json(state.engine.templates().list(q.property_id.as_deref()).await?))
}

/// POST /v1/templates
pub async fn create_template(
    State(state): State<AppState>,
    Json(draft): Json<TemplateDraft>,
) -> Result<(StatusCode, Json<MessageTemplate>), ApiError> {
    let template = state.engine.templates().create(draft).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

/// GET /v1/templates/{id}
pub async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<MessageTemplate> {
    Ok(Json(state.engine.templates().get(&id).await?))
}

/// PUT /v1/templates/{id}
pub async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(draft): Json<TemplateDraft>,
) -> ApiResult<MessageTemplate> {
    Ok(Json(state.engine.templates().update(&id, draft).await?))
}

/// PUT /v1/templates/{id}/trigger
pub async fn attach_trigger(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(rule): Json<TriggerRule>,
) -> ApiResult<MessageTemplate> {
    Ok(Json(state.engine.templates().attach_trigger(&id, rule).await?))
}

/// DELETE /v1/templates/{id}/trigger
pub async fn detach_trigger(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<MessageTemplate> {
    Ok(Json(state.engine.templates().detach_trigger(&id).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct PreviewRequest {
    #[serde(default)]
    pub guest_id: Option<String>,
    #[serde(default)]
    pub reservation_id: Option<String>,
}

/// POST /v1/templates/{id}/preview
pub async fn preview_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<PreviewRequest>,
) -> ApiResult<Preview> {
    let preview = state
        .engine
        .templates()
        .preview(&id, req.guest_id.as_deref(), req.reservation_id.as_deref())
        .await?;
    Ok(Json(preview))
}

// --- Scheduled messages ---

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub template_id: String,
    pub guest_id: String,
    #[serde(default)]
    pub reservation_id: Option<String>,
}

/// GET /v1/scheduled
pub async fn list_scheduled(State(state): State<AppState>) -> ApiResult<Vec<ScheduledMessage>> {
    Ok(Json(state.engine.scheduler().list_scheduled().await?))
}

/// POST /v1/scheduled
///
/// Evaluate a template's trigger for one guest now.
pub async fn schedule_message(
    State(state): State<AppState>,
    Json(req): Json<MessageRequest>,
) -> ApiResult<ScheduleResult> {
    let result = state
        .engine
        .scheduler()
        .schedule_template(&req.template_id, &req.guest_id, req.reservation_id.as_deref())
        .await?;
    Ok(Json(result))
}

/// POST /v1/messages
///
/// Send a template to a guest immediately, outside any schedule.
pub async fn send_adhoc(
    State(state): State<AppState>,
    Json(req): Json<MessageRequest>,
) -> ApiResult<ScheduledMessage> {
    let message = state
        .engine
        .scheduler()
        .send_adhoc(&req.template_id, &req.guest_id, req.reservation_id.as_deref(), None)
        .await?;
    Ok(Json(message))
}

/// POST /v1/scheduled/{id}/cancel
pub async fn cancel_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ScheduledMessage> {
    Ok(Json(state.engine.scheduler().cancel(&id).await?))
}

/// POST /v1/scheduled/{id}/send
pub async fn send_message_now(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ScheduledMessage> {
    Ok(Json(state.engine.scheduler().send_now(&id).await?))
}

// --- Contracts ---

#[derive(Debug, Deserialize)]
pub struct GenerateContractRequest {
    pub guest_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SignedRequest {
    pub handle: DocumentHandle,
}

/// POST /v1/contracts
pub async fn generate_contract(
    State(state): State<AppState>,
    Json(req): Json<GenerateContractRequest>,
) -> Result<(StatusCode, Json<ContractDelivery>), ApiError> {
    let delivery = state
        .engine
        .contracts()
        .generate_and_schedule(&req.guest_id)
        .await?;
    Ok((StatusCode::CREATED, Json(delivery)))
}

/// GET /v1/contracts/{id}
pub async fn get_contract(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Contract> {
    Ok(Json(state.engine.contracts().get(&id).await?))
}

/// POST /v1/contracts/{id}/signed
pub async fn contract_signed(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SignedRequest>,
) -> ApiResult<Contract> {
    Ok(Json(state.engine.contracts().on_signed(&id, req.handle).await?))
}

/// POST /v1/contracts/{id}/regenerate
pub async fn regenerate_contract(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Contract> {
    Ok(Json(state.engine.contracts().regenerate_document(&id).await?))
}

/// POST /v1/contracts/{id}/retry
pub async fn retry_contract(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ContractDelivery> {
    Ok(Json(state.engine.contracts().retry_delivery(&id).await?))
}

/// POST /v1/contracts/{id}/expire
pub async fn expire_contract(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Contract> {
    Ok(Json(state.engine.contracts().expire(&id).await?))
}

/// GET /v1/contracts/{id}/download
pub async fn download_contract(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DocumentRef> {
    Ok(Json(state.engine.contracts().download(&id).await?))
}

/// GET /documents/{handle}
pub async fn get_document(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> Result<Response, ApiError> {
    let Some(documents) = &state.documents else {
        return Err(StaydeskError::not_found("document", handle).into());
    };
    let html = documents.load(&DocumentHandle(handle)).await?;
    Ok(([(header::CONTENT_TYPE, "text/html; charset=utf-8")], html).into_response())
}

// --- Invitations ---

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub contact: Contact,
    pub role: String,
    pub property_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct InviteFailure {
    pub property_id: String,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct InviteResponse {
    pub outcome: FanoutOutcome,
    pub succeeded: Vec<String>,
    pub failed: Vec<InviteFailure>,
}

/// POST /v1/invitations
pub async fn invite_contact(
    State(state): State<AppState>,
    Json(req): Json<InviteRequest>,
) -> ApiResult<InviteResponse> {
    let result = state
        .engine
        .invitations()
        .invite_contact(&req.contact, &req.role, req.property_ids)
        .await?;
    Ok(Json(InviteResponse {
        outcome: result.outcome(),
        succeeded: result.succeeded,
        failed: result
            .failed
            .into_iter()
            .map(|(property_id, reason)| InviteFailure {
                property_id,
                reason,
            })
            .collect(),
    }))
}

// --- Domain events ---

#[derive(Debug, Deserialize)]
pub struct VerificationEvent {
    pub guest_id: String,
    #[serde(default)]
    pub verified_at: Option<DateTime<Utc>>,
}

/// POST /v1/events/reservation
pub async fn reservation_event(
    State(state): State<AppState>,
    Json(reservation): Json<Reservation>,
) -> ApiResult<Vec<ScheduleResult>> {
    Ok(Json(
        state
            .engine
            .scheduler()
            .on_reservation_changed(&reservation)
            .await?,
    ))
}

/// POST /v1/events/verification
pub async fn verification_event(
    State(state): State<AppState>,
    Json(event): Json<VerificationEvent>,
) -> ApiResult<Vec<ScheduleResult>> {
    let verified_at = event.verified_at.unwrap_or_else(Utc::now);
    Ok(Json(
        state
            .engine
            .scheduler()
            .on_verification_completed(&event.guest_id, verified_at)
            .await?,
    ))
}

/// POST /v1/events/guest
pub async fn guest_event(
    State(state): State<AppState>,
    Json(guest): Json<Guest>,
) -> Result<StatusCode, ApiError> {
    state.engine.scheduler().on_guest_changed(&guest).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/events/property
pub async fn property_event(
    State(state): State<AppState>,
    Json(property): Json<Property>,
) -> Result<StatusCode, ApiError> {
    state.engine.scheduler().on_property_changed(&property).await?;
    Ok(StatusCode::NO_CONTENT)
}
