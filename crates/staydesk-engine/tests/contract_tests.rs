// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contract lifecycle transitions.

use staydesk_core::types::{
    Channel, ContractStatus, DocumentHandle, MessageState, TemplateKind,
};
use staydesk_core::{DirectoryStore, GatewayError, ScheduleStore, StaydeskError};
use staydesk_engine::Engine;
use staydesk_engine::contract::ContractDelivery;
use staydesk_test_utils::TestHarness;
use staydesk_test_utils::fixtures::{draft, guest};
use staydesk_test_utils::harness::{GUEST, RESERVATION};

async fn setup() -> (TestHarness, Engine) {
    let h = TestHarness::new().await.unwrap();
    h.seed_stay().await.unwrap();
    let engine = Engine::new(
        h.storage.clone(),
        h.gateway.clone(),
        h.renderer.clone(),
        &h.config,
    );
    let mut contract_ready = draft(TemplateKind::ContractReady, &[Channel::Email], None);
    contract_ready.body = "Please sign: {contract_link}".into();
    engine.templates().create(contract_ready).await.unwrap();
    (h, engine)
}

async fn sent_for_signing(engine: &Engine) -> ContractDelivery {
    let delivery = engine.contracts().generate_and_schedule(GUEST).await.unwrap();
    assert_eq!(delivery.contract.status, ContractStatus::SentForSigning);
    delivery
}

fn assert_invalid_transition(err: StaydeskError) {
    assert!(
        matches!(err, StaydeskError::InvalidTransition { entity: "contract", .. }),
        "expected InvalidTransition, got {err:?}"
    );
}

#[tokio::test]
async fn generate_renders_draft_and_sends_for_signing() {
    let (h, engine) = setup().await;
    let delivery = sent_for_signing(&engine).await;

    assert!(delivery.failure.is_none());
    assert_eq!(delivery.contract.reservation_id, RESERVATION);
    assert_eq!(delivery.message.state, MessageState::Sent);
    assert_eq!(delivery.message.contract_id.as_deref(), Some(delivery.contract.id.as_str()));
    assert_eq!(delivery.message.fire_at, None);

    let rendered = h.renderer.rendered().await;
    assert_eq!(rendered.len(), 1);
    assert_eq!(delivery.contract.draft_document, Some(rendered[0].handle.clone()));
    assert!(rendered[0].document.body.contains("between Nadia and Amel"));
    assert!(rendered[0].document.body.contains("from 10/06/2024 15:00"));
    assert!(rendered[0].signature.is_none());

    let delivered = h.gateway.delivered().await;
    assert_eq!(delivered.len(), 1);
    assert_eq!(
        delivered[0].body,
        "Please sign: https://app.staydesk.io/verify/tok-g1?step=contract"
    );
}

#[tokio::test]
async fn failed_delivery_keeps_contract_generated_until_retry() {
    let (h, engine) = setup().await;
    h.gateway
        .fail_next(GatewayError::Network("connection reset".into()))
        .await;

    let delivery = engine.contracts().generate_and_schedule(GUEST).await.unwrap();
    assert_eq!(delivery.contract.status, ContractStatus::Generated);
    assert_eq!(delivery.message.state, MessageState::Failed);
    assert!(delivery.failure.as_ref().unwrap().retryable);

    let retried = engine
        .contracts()
        .retry_delivery(&delivery.contract.id)
        .await
        .unwrap();
    assert!(retried.failure.is_none());
    assert_eq!(retried.contract.status, ContractStatus::SentForSigning);
    assert_ne!(retried.message.id, delivery.message.id);

    let linked = h
        .storage
        .messages_for_contract(&delivery.contract.id)
        .await
        .unwrap();
    assert_eq!(linked.len(), 2);
    assert!(linked.iter().any(|m| m.id == delivery.message.id && m.state == MessageState::Failed));
    assert!(linked.iter().any(|m| m.id == retried.message.id && m.state == MessageState::Sent));

    let err = engine
        .contracts()
        .retry_delivery(&delivery.contract.id)
        .await
        .unwrap_err();
    assert_invalid_transition(err);
}

#[tokio::test]
async fn signing_records_the_handle_once() {
    let (_h, engine) = setup().await;
    let delivery = sent_for_signing(&engine).await;
    let id = delivery.contract.id;

    let signed = engine
        .contracts()
        .on_signed(&id, DocumentHandle("sig-1".into()))
        .await
        .unwrap();
    assert_eq!(signed.status, ContractStatus::Signed);
    assert!(signed.signed_at.is_some());
    assert_eq!(signed.signed_document, Some(DocumentHandle("sig-1".into())));
    assert_eq!(signed.signature, Some(DocumentHandle("sig-1".into())));

    let err = engine
        .contracts()
        .on_signed(&id, DocumentHandle("sig-2".into()))
        .await
        .unwrap_err();
    assert_invalid_transition(err);
    let stored = engine.contracts().get(&id).await.unwrap();
    assert_eq!(stored.signed_document, Some(DocumentHandle("sig-1".into())));
}

#[tokio::test]
async fn download_requires_a_signed_contract() {
    let (h, engine) = setup().await;
    h.gateway
        .fail_next(GatewayError::Rejected("no".into()))
        .await;
    let delivery = engine.contracts().generate_and_schedule(GUEST).await.unwrap();
    assert_eq!(delivery.contract.status, ContractStatus::Generated);

    let err = engine.contracts().download(&delivery.contract.id).await.unwrap_err();
    assert_invalid_transition(err);
    let err = engine
        .contracts()
        .on_signed(&delivery.contract.id, DocumentHandle("sig".into()))
        .await
        .unwrap_err();
    assert_invalid_transition(err);
}

#[tokio::test]
async fn regenerate_replaces_handle_and_keeps_signature_time() {
    let (h, engine) = setup().await;
    let id = sent_for_signing(&engine).await.contract.id;
    engine
        .contracts()
        .on_signed(&id, DocumentHandle("sig-1".into()))
        .await
        .unwrap();
    let signed = engine.contracts().get(&id).await.unwrap();

    let regenerated = engine.contracts().regenerate_document(&id).await.unwrap();
    assert_eq!(regenerated.status, ContractStatus::Signed);
    assert_eq!(regenerated.signed_at, signed.signed_at);
    assert_eq!(
        regenerated.signed_document,
        Some(DocumentHandle(format!("{id}-v2-signed")))
    );

    let rendered = h.renderer.rendered().await;
    assert_eq!(rendered[1].signature, Some(DocumentHandle("sig-1".into())));

    let reference = engine.contracts().download(&id).await.unwrap();
    assert_eq!(reference.url, format!("https://docs.test/{id}-v2-signed"));
}

#[tokio::test]
async fn repeated_regeneration_keeps_embedding_the_guest_signature() {
    let (h, engine) = setup().await;
    let id = sent_for_signing(&engine).await.contract.id;
    engine
        .contracts()
        .on_signed(&id, DocumentHandle("sig-1".into()))
        .await
        .unwrap();

    engine.contracts().regenerate_document(&id).await.unwrap();
    let second = engine.contracts().regenerate_document(&id).await.unwrap();

    let rendered = h.renderer.rendered().await;
    assert_eq!(rendered.len(), 3);
    assert_eq!(rendered[1].signature, Some(DocumentHandle("sig-1".into())));
    assert_eq!(rendered[2].signature, Some(DocumentHandle("sig-1".into())));
    assert_eq!(second.signature, Some(DocumentHandle("sig-1".into())));
    assert_eq!(
        second.signed_document,
        Some(DocumentHandle(format!("{id}-v3-signed")))
    );

    let stored = engine.contracts().get(&id).await.unwrap();
    assert_eq!(stored.signature, Some(DocumentHandle("sig-1".into())));
}

#[tokio::test]
async fn regenerate_before_signing_is_rejected() {
    let (_h, engine) = setup().await;
    let id = sent_for_signing(&engine).await.contract.id;
    let err = engine.contracts().regenerate_document(&id).await.unwrap_err();
    assert_invalid_transition(err);
}

#[tokio::test]
async fn expire_only_from_unsigned_states() {
    let (_h, engine) = setup().await;
    let id = sent_for_signing(&engine).await.contract.id;

    let expired = engine.contracts().expire(&id).await.unwrap();
    assert_eq!(expired.status, ContractStatus::Expired);
    assert_invalid_transition(engine.contracts().expire(&id).await.unwrap_err());
    assert_invalid_transition(
        engine
            .contracts()
            .on_signed(&id, DocumentHandle("late".into()))
            .await
            .unwrap_err(),
    );

    let other = sent_for_signing(&engine).await.contract.id;
    engine
        .contracts()
        .on_signed(&other, DocumentHandle("sig".into()))
        .await
        .unwrap();
    assert_invalid_transition(engine.contracts().expire(&other).await.unwrap_err());
}

#[tokio::test]
async fn generate_needs_reservation_and_template() {
    let (h, engine) = setup().await;
    h.storage.upsert_guest(&guest("g2", "Noor")).await.unwrap();
    let err = engine.contracts().generate_and_schedule("g2").await.unwrap_err();
    assert!(matches!(err, StaydeskError::Validation(_)));

    let err = engine.contracts().generate_and_schedule("nobody").await.unwrap_err();
    assert!(matches!(err, StaydeskError::NotFound { entity: "guest", .. }));

    let bare = TestHarness::new().await.unwrap();
    bare.seed_stay().await.unwrap();
    let engine = Engine::new(
        bare.storage.clone(),
        bare.gateway.clone(),
        bare.renderer.clone(),
        &bare.config,
    );
    let err = engine.contracts().generate_and_schedule(GUEST).await.unwrap_err();
    assert!(matches!(err, StaydeskError::NotFound { entity: "template", .. }));
    assert!(bare.renderer.rendered().await.is_empty());
}
