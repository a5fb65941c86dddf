// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the SQLite storage adapter.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use staydesk_config::model::StorageConfig;
use staydesk_core::types::*;
use staydesk_core::{
    ContractStore, DirectoryStore, InvitationStore, ScheduleStore, StorageAdapter, TemplateStore,
};
use staydesk_storage::SqliteStorage;
use tempfile::TempDir;

const TTL: Duration = Duration::from_secs(60);

async fn open() -> (TempDir, SqliteStorage) {
    let dir = tempfile::tempdir().unwrap();
    let storage = SqliteStorage::new(StorageConfig {
        database_path: dir.path().join("test.db").to_string_lossy().into_owned(),
        wal_mode: true,
    });
    storage.initialize().await.unwrap();
    (dir, storage)
}

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap()
}

fn template(kind: TemplateKind, property_id: Option<&str>, updated: DateTime<Utc>) -> MessageTemplate {
    MessageTemplate {
        id: uuid::Uuid::new_v4().to_string(),
        name: kind.to_string(),
        kind,
        property_id: property_id.map(String::from),
        subject: Some("Hello".into()),
        body: "Hi {guest_name}".into(),
        channels: BTreeSet::from([Channel::Email, Channel::Sms]),
        language: "en".into(),
        active: true,
        trigger: Some(TriggerRule {
            event: TriggerEvent::CheckIn,
            offset: 2,
            unit: OffsetUnit::Days,
            direction: Direction::Before,
        }),
        created_at: updated,
        updated_at: updated,
    }
}

#[tokio::test]
async fn template_survives_storage_with_trigger() {
    let (_dir, storage) = open().await;
    let t = template(TemplateKind::Custom("pool_rules".into()), Some("p1"), at(1, 9));
    storage.insert_template(&t).await.unwrap();

    let loaded = storage.get_template(&t.id).await.unwrap().unwrap();
    assert_eq!(loaded, t);

    let mut manual = template(TemplateKind::Checkout, None, at(1, 9));
    manual.trigger = None;
    manual.subject = None;
    storage.insert_template(&manual).await.unwrap();
    let loaded = storage.get_template(&manual.id).await.unwrap().unwrap();
    assert_eq!(loaded.trigger, None);
}

#[tokio::test]
async fn update_missing_template_is_not_found() {
    let (_dir, storage) = open().await;
    let t = template(TemplateKind::Welcome, None, at(1, 9));
    let err = storage.update_template(&t).await.unwrap_err();
    assert!(matches!(err, staydesk_core::StaydeskError::NotFound { .. }));
}

#[tokio::test]
async fn property_specific_template_is_preferred() {
    let (_dir, storage) = open().await;
    let wide = template(TemplateKind::ContractReady, None, at(3, 9));
    let own = template(TemplateKind::ContractReady, Some("p1"), at(1, 9));
    let other = template(TemplateKind::ContractReady, Some("p2"), at(5, 9));
    for t in [&wide, &own, &other] {
        storage.insert_template(t).await.unwrap();
    }

    let found = storage
        .find_active_by_kind(&TemplateKind::ContractReady, "p1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, own.id);

    let found = storage
        .find_active_by_kind(&TemplateKind::ContractReady, "p3")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, wide.id);

    let visible = storage.list_templates(Some("p1")).await.unwrap();
    assert_eq!(visible.len(), 2);
    assert_eq!(storage.list_templates(None).await.unwrap().len(), 3);
}

#[tokio::test]
async fn inactive_templates_are_not_triggered() {
    let (_dir, storage) = open().await;
    let mut t = template(TemplateKind::Checkin, None, at(1, 9));
    t.active = false;
    storage.insert_template(&t).await.unwrap();
    let found = storage
        .templates_for_event(TriggerEvent::CheckIn, "p1")
        .await
        .unwrap();
    assert!(found.is_empty());
}

#[tokio::test]
async fn reservations_are_latest_first() {
    let (_dir, storage) = open().await;
    for (id, check_in) in [("r-old", Some(at(1, 15))), ("r-none", None), ("r-new", Some(at(20, 15)))] {
        storage
            .upsert_reservation(&Reservation {
                id: id.into(),
                guest_id: "g1".into(),
                property_id: "p1".into(),
                check_in,
                check_out: None,
            })
            .await
            .unwrap();
    }
    let ids: Vec<_> = storage
        .reservations_for_guest("g1")
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec!["r-new", "r-old", "r-none"]);
}

#[tokio::test]
async fn upsert_supersedes_instead_of_duplicating() {
    let (_dir, storage) = open().await;
    let first = ScheduledMessage::new("t1", "g1", Some("r1".into()), Some(at(8, 15)), at(1, 0));
    let outcome = storage.upsert_scheduled(&first).await.unwrap();
    assert!(matches!(outcome, UpsertOutcome::Inserted(_)));

    let second = ScheduledMessage::new("t1", "g1", Some("r1".into()), Some(at(9, 15)), at(2, 0));
    match storage.upsert_scheduled(&second).await.unwrap() {
        UpsertOutcome::Superseded(m) => {
            assert_eq!(m.id, first.id);
            assert_eq!(m.fire_at, Some(at(9, 15)));
        }
        other => panic!("expected supersede, got {other:?}"),
    }

    let scheduled = storage.list_scheduled().await.unwrap();
    assert_eq!(scheduled.len(), 1);
    assert_eq!(scheduled[0].fire_at, Some(at(9, 15)));
}

#[tokio::test]
async fn upsert_reports_in_flight_record() {
    let (_dir, storage) = open().await;
    let first = ScheduledMessage::new("t1", "g1", Some("r1".into()), Some(at(1, 0)), at(1, 0));
    storage.upsert_scheduled(&first).await.unwrap();
    let ClaimOutcome::Claimed(_) = storage.claim(&first.id, at(1, 0), TTL).await.unwrap() else {
        panic!("claim should succeed");
    };

    let again = ScheduledMessage::new("t1", "g1", Some("r1".into()), Some(at(2, 0)), at(1, 0));
    let outcome = storage.upsert_scheduled(&again).await.unwrap();
    assert_eq!(outcome, UpsertOutcome::InFlight { id: first.id.clone() });
    let stored = storage.get_message(&first.id).await.unwrap().unwrap();
    assert_eq!(stored.fire_at, Some(at(1, 0)));
}

#[tokio::test]
async fn resolved_record_frees_the_dedupe_key() {
    let (_dir, storage) = open().await;
    let first = ScheduledMessage::new("t1", "g1", None, Some(at(1, 0)), at(1, 0));
    storage.upsert_scheduled(&first).await.unwrap();
    let ClaimOutcome::Claimed(claim) = storage.claim(&first.id, at(1, 0), TTL).await.unwrap() else {
        panic!("claim should succeed");
    };
    assert!(storage.complete(&claim, MessageState::Sent, at(1, 0), None, false).await.unwrap());

    let next = ScheduledMessage::new("t1", "g1", None, Some(at(3, 0)), at(2, 0));
    let outcome = storage.upsert_scheduled(&next).await.unwrap();
    assert!(matches!(outcome, UpsertOutcome::Inserted(_)));
}

#[tokio::test]
async fn claim_is_exclusive_until_it_expires() {
    let (_dir, storage) = open().await;
    let m = ScheduledMessage::new("t1", "g1", None, Some(at(1, 0)), at(1, 0));
    storage.insert_message(&m).await.unwrap();

    let now = at(1, 1);
    let ClaimOutcome::Claimed(first) = storage.claim(&m.id, now, TTL).await.unwrap() else {
        panic!("first claim should succeed");
    };
    assert_eq!(storage.claim(&m.id, now, TTL).await.unwrap(), ClaimOutcome::Busy);
    assert!(storage.due_messages(now, 10).await.unwrap().is_empty());

    let later = now + TimeDelta::seconds(61);
    let ClaimOutcome::Claimed(second) = storage.claim(&m.id, later, TTL).await.unwrap() else {
        panic!("expired claim should be taken over");
    };
    assert_ne!(first.token, second.token);

    // The original holder lost the lease and cannot write its outcome.
    assert!(!storage.complete(&first, MessageState::Failed, later, Some("late"), true).await.unwrap());
    assert!(storage.complete(&second, MessageState::Sent, later, None, false).await.unwrap());

    let stored = storage.get_message(&m.id).await.unwrap().unwrap();
    assert_eq!(stored.state, MessageState::Sent);
    assert_eq!(stored.resolved_at, Some(later));
    assert_eq!(stored.last_error, None);
}

#[tokio::test]
async fn claim_reports_resolved_and_missing() {
    let (_dir, storage) = open().await;
    let m = ScheduledMessage::new("t1", "g1", None, None, at(1, 0));
    storage.insert_message(&m).await.unwrap();
    let ClaimOutcome::Claimed(claim) = storage.claim(&m.id, at(1, 0), TTL).await.unwrap() else {
        panic!("claim should succeed");
    };
    storage
        .complete(&claim, MessageState::Cancelled, at(1, 0), None, false)
        .await
        .unwrap();

    assert_eq!(
        storage.claim(&m.id, at(1, 0), TTL).await.unwrap(),
        ClaimOutcome::Resolved(MessageState::Cancelled)
    );
    assert_eq!(
        storage.claim("nope", at(1, 0), TTL).await.unwrap(),
        ClaimOutcome::Missing
    );
}

#[tokio::test]
async fn release_makes_record_claimable_again() {
    let (_dir, storage) = open().await;
    let m = ScheduledMessage::new("t1", "g1", None, Some(at(1, 0)), at(1, 0));
    storage.insert_message(&m).await.unwrap();
    let ClaimOutcome::Claimed(claim) = storage.claim(&m.id, at(1, 0), TTL).await.unwrap() else {
        panic!("claim should succeed");
    };
    storage.release(&claim).await.unwrap();
    assert_eq!(storage.due_messages(at(1, 0), 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn list_and_due_ordering() {
    let (_dir, storage) = open().await;
    let manual = ScheduledMessage::new("t-manual", "g1", None, None, at(1, 0));
    let late = ScheduledMessage::new("t-late", "g1", None, Some(at(10, 0)), at(1, 1));
    let early = ScheduledMessage::new("t-early", "g1", None, Some(at(2, 0)), at(1, 2));
    for m in [&manual, &late, &early] {
        storage.insert_message(m).await.unwrap();
    }

    let ids: Vec<_> = storage
        .list_scheduled()
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.template_id)
        .collect();
    assert_eq!(ids, vec!["t-early", "t-late", "t-manual"]);

    let due = storage.due_messages(at(5, 0), 10).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].template_id, "t-early");
}

#[tokio::test]
async fn contract_compare_and_set() {
    let (_dir, storage) = open().await;
    let mut contract = Contract::generated("g1", "r1", at(1, 0));
    contract.draft_document = Some(DocumentHandle("draft.html".into()));
    storage.insert_contract(&contract).await.unwrap();

    let mut sent = contract.clone();
    sent.status = ContractStatus::SentForSigning;
    assert!(
        storage
            .compare_and_set_contract(&sent, ContractStatus::Generated)
            .await
            .unwrap()
    );
    // Stale expectation is refused.
    assert!(
        !storage
            .compare_and_set_contract(&sent, ContractStatus::Generated)
            .await
            .unwrap()
    );

    let mut signed = sent.clone();
    signed.status = ContractStatus::Signed;
    signed.signed_at = Some(at(2, 0));
    signed.signature = Some(DocumentHandle("sig.png".into()));
    signed.signed_document = Some(DocumentHandle("signed.html".into()));
    assert!(
        storage
            .compare_and_set_contract(&signed, ContractStatus::SentForSigning)
            .await
            .unwrap()
    );
    assert_eq!(storage.get_contract(&contract.id).await.unwrap().unwrap(), signed);
}

#[tokio::test]
async fn contract_messages_are_linked() {
    let (_dir, storage) = open().await;
    let contract = Contract::generated("g1", "r1", at(1, 0));
    storage.insert_contract(&contract).await.unwrap();
    let mut m = ScheduledMessage::new("t1", "g1", Some("r1".into()), None, at(1, 0));
    m.contract_id = Some(contract.id.clone());
    storage.insert_message(&m).await.unwrap();

    let linked = storage.messages_for_contract(&contract.id).await.unwrap();
    assert_eq!(linked, vec![m]);
}

#[tokio::test]
async fn one_active_invitation_per_property_and_address() {
    let (_dir, storage) = open().await;
    let contact = Contact {
        name: Some("Sam".into()),
        email: Some("sam@example.com".into()),
        phone: None,
    };
    let first = Invitation::pending("p1", contact.clone(), "sam@example.com".into(), "cleaner", at(1, 0));
    storage.insert_invitation(&first).await.unwrap();

    let dup = Invitation::pending("p1", contact.clone(), "sam@example.com".into(), "cleaner", at(1, 0));
    assert!(storage.insert_invitation(&dup).await.is_err());

    storage
        .set_invitation_status(&first.id, InvitationStatus::Failed, at(1, 1))
        .await
        .unwrap();
    assert!(
        storage
            .find_active_invitation("p1", "sam@example.com")
            .await
            .unwrap()
            .is_none()
    );
    storage.insert_invitation(&dup).await.unwrap();
    let active = storage
        .find_active_invitation("p1", "sam@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(active.id, dup.id);
}

#[tokio::test]
async fn directory_upserts_overwrite() {
    let (_dir, storage) = open().await;
    let mut guest = Guest {
        id: "g1".into(),
        full_name: Some("Amel".into()),
        email: None,
        phone: None,
        verification_token: Some("tok".into()),
        token_issued_at: Some(at(1, 0)),
        verified_at: None,
    };
    storage.upsert_guest(&guest).await.unwrap();
    guest.verified_at = Some(at(2, 10));
    storage.upsert_guest(&guest).await.unwrap();
    assert_eq!(storage.get_guest("g1").await.unwrap().unwrap(), guest);

    let property = Property {
        id: "p1".into(),
        name: "Villa X".into(),
        address: None,
        owner_name: Some("Nadia".into()),
        owner_phone: None,
    };
    storage.upsert_property(&property).await.unwrap();
    assert_eq!(storage.get_property("p1").await.unwrap().unwrap(), property);
    assert!(storage.get_reservation("missing").await.unwrap().is_none());
}
