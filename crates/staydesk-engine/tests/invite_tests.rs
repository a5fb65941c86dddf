// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bulk invitations across properties.

use staydesk_core::types::{Channel, Contact, InvitationStatus};
use staydesk_core::{DirectoryStore, GatewayError, InvitationStore, StaydeskError};
use staydesk_engine::Engine;
use staydesk_engine::fanout::FanoutOutcome;
use staydesk_test_utils::TestHarness;
use staydesk_test_utils::fixtures::property;

async fn setup() -> (TestHarness, Engine) {
    let h = TestHarness::new().await.unwrap();
    for (id, name) in [("p1", "Villa X"), ("p3", "Casa Mar")] {
        h.storage.upsert_property(&property(id, name)).await.unwrap();
    }
    let engine = Engine::new(
        h.storage.clone(),
        h.gateway.clone(),
        h.renderer.clone(),
        &h.config,
    );
    (h, engine)
}

fn cleaner() -> Contact {
    Contact {
        name: Some("Sam".into()),
        email: Some("Sam@Clean.test".into()),
        phone: Some("+31622222222".into()),
    }
}

fn ids(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn one_missing_property_is_a_partial_outcome() {
    let (h, engine) = setup().await;
    let result = engine
        .invitations()
        .invite_contact(&cleaner(), "cleaner", ids(&["p1", "p2", "p3"]))
        .await
        .unwrap();

    assert_eq!(result.succeeded, ids(&["p1", "p3"]));
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].0, "p2");
    assert!(result.failed[0].1.contains("property `p2` not found"));
    assert_eq!(result.outcome(), FanoutOutcome::Partial);

    let delivered = h.gateway.delivered().await;
    assert_eq!(delivered.len(), 2);
    assert!(delivered.iter().all(|d| d.channel == Channel::Email));
    assert!(
        delivered
            .iter()
            .any(|d| d.subject.as_deref() == Some("You have been invited to Casa Mar"))
    );

    let stored = h
        .storage
        .find_active_invitation("p1", "sam@clean.test")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, InvitationStatus::Sent);
    assert_eq!(stored.role, "cleaner");
}

#[tokio::test]
async fn repeat_invite_fails_per_property() {
    let (h, engine) = setup().await;
    engine
        .invitations()
        .invite_contact(&cleaner(), "cleaner", ids(&["p1", "p3"]))
        .await
        .unwrap();

    let again = engine
        .invitations()
        .invite_contact(&cleaner(), "cleaner", ids(&["p1", "p3", "p1"]))
        .await
        .unwrap();
    assert_eq!(again.outcome(), FanoutOutcome::Failed);
    assert_eq!(again.failed.len(), 2, "duplicate ids are collapsed");
    assert!(again.failed.iter().all(|(_, reason)| reason.contains("already invited")));
    assert_eq!(h.gateway.delivered_count().await, 2);
}

#[tokio::test]
async fn gateway_failure_marks_invitation_failed_and_allows_retry() {
    let (h, engine) = setup().await;
    h.gateway
        .fail_next(GatewayError::Unavailable("down".into()))
        .await;

    let first = engine
        .invitations()
        .invite_contact(&cleaner(), "cleaner", ids(&["p1"]))
        .await
        .unwrap();
    assert_eq!(first.outcome(), FanoutOutcome::Failed);
    assert!(first.failed[0].1.contains("gateway unavailable"));
    assert!(
        h.storage
            .find_active_invitation("p1", "sam@clean.test")
            .await
            .unwrap()
            .is_none()
    );

    let retry = engine
        .invitations()
        .invite_contact(&cleaner(), "cleaner", ids(&["p1"]))
        .await
        .unwrap();
    assert_eq!(retry.outcome(), FanoutOutcome::Complete);
}

#[tokio::test]
async fn phone_only_contact_is_invited_by_sms() {
    let (h, engine) = setup().await;
    let contact = Contact {
        name: None,
        email: Some("  ".into()),
        phone: Some("+31633333333".into()),
    };
    let result = engine
        .invitations()
        .invite_contact(&contact, "co-host", ids(&["p1"]))
        .await
        .unwrap();
    assert_eq!(result.outcome(), FanoutOutcome::Complete);

    let delivered = h.gateway.delivered().await;
    assert_eq!(delivered[0].channel, Channel::Sms);
    assert_eq!(delivered[0].address, "+31633333333");
    assert!(delivered[0].subject.is_none());
    assert!(delivered[0].body.contains("co-host for Villa X"));
}

#[tokio::test]
async fn invalid_requests_are_rejected_before_any_send() {
    let (h, engine) = setup().await;
    let nobody = Contact {
        name: Some("Ghost".into()),
        email: None,
        phone: None,
    };
    let err = engine
        .invitations()
        .invite_contact(&nobody, "cleaner", ids(&["p1"]))
        .await
        .unwrap_err();
    assert!(matches!(err, StaydeskError::Validation(_)));

    let err = engine
        .invitations()
        .invite_contact(&cleaner(), "cleaner", Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, StaydeskError::Validation(_)));

    let err = engine
        .invitations()
        .invite_contact(&cleaner(), " ", ids(&["p1"]))
        .await
        .unwrap_err();
    assert!(matches!(err, StaydeskError::Validation(_)));

    assert_eq!(h.gateway.attempts().await, 0);
}

#[tokio::test]
async fn invitation_text_uses_template_placeholder_rules() {
    let mut h = TestHarness::new().await.unwrap();
    h.storage.upsert_property(&property("p1", "Villa X")).await.unwrap();
    h.config.invitations.subject = "{{ property_name }} needs a {role}".into();
    h.config.invitations.body = "Welcome {{role}} to {property_name}{guest_name}.".into();
    let engine = Engine::new(
        h.storage.clone(),
        h.gateway.clone(),
        h.renderer.clone(),
        &h.config,
    );

    engine
        .invitations()
        .invite_contact(&cleaner(), "cleaner", ids(&["p1"]))
        .await
        .unwrap();

    let delivered = h.gateway.delivered().await;
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].subject.as_deref(), Some("Villa X needs a cleaner"));
    assert_eq!(delivered[0].body, "Welcome cleaner to Villa X.");
}
