// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scheduled message lifecycle: creation from trigger rules, operator
//! actions, and the periodic sweep.
//!
//! Every transition out of `scheduled` happens under a claim taken from the
//! store. The sweep skips records someone else holds; operator actions on a
//! held record fail with `ActionInProgress`.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use staydesk_config::model::EngineConfig;
use staydesk_core::types::{
    Claim, ClaimOutcome, ContractStatus, Guest, MessageState, MessageTemplate, Property,
    Reservation, ScheduledMessage, TriggerEvent, TriggerRule, UpsertOutcome, is_storable_instant,
};
use staydesk_core::{StaydeskError, StorageAdapter};
use tracing::{debug, info, warn};

use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::trigger::{Resolution, UnresolvedReason, resolve};

fn require_storable(field: &str, at: Option<DateTime<Utc>>) -> Result<(), StaydeskError> {
    match at {
        Some(at) if !is_storable_instant(&at) => Err(StaydeskError::Validation(format!(
            "{field} {at} is outside years 0 to 9999"
        ))),
        _ => Ok(()),
    }
}

/// What happened when a template was evaluated for a guest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ScheduleResult {
    Scheduled { message: ScheduledMessage },
    /// An existing `scheduled` record had its fire time replaced.
    Superseded { message: ScheduledMessage },
    /// The existing record is being dispatched; it was left alone.
    InFlight { id: String },
    /// Not enough facts yet. Nothing was written.
    Deferred {
        template_id: String,
        reason: UnresolvedReason,
    },
}

/// Summary of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub due: usize,
    pub sent: usize,
    pub failed: usize,
    /// Claimed elsewhere or resolved between listing and claiming.
    pub skipped: usize,
    /// Records whose processing hit a storage error; they stay `scheduled`.
    pub errors: usize,
}

enum SweepItem {
    Sent,
    Failed,
    Skipped,
    Error,
}

pub struct Scheduler {
    storage: Arc<dyn StorageAdapter>,
    dispatcher: Dispatcher,
    claim_ttl: Duration,
    batch_size: usize,
    concurrency: usize,
}

impl Scheduler {
    pub fn new(storage: Arc<dyn StorageAdapter>, dispatcher: Dispatcher, config: &EngineConfig) -> Self {
        Self {
            storage,
            dispatcher,
            claim_ttl: Duration::from_secs(config.claim_ttl_secs),
            batch_size: config.sweep_batch_size.max(1),
            concurrency: config.sweep_concurrency.max(1),
        }
    }

    // --- Creation ---

    /// Evaluate one template for a guest and persist the result.
    ///
    /// Templates without a rule, or with a manual rule, produce a record with
    /// no fire time that only an operator can send.
    pub async fn schedule_template(
        &self,
        template_id: &str,
        guest_id: &str,
        reservation_id: Option<&str>,
    ) -> Result<ScheduleResult, StaydeskError> {
        let template = self
            .storage
            .get_template(template_id)
            .await?
            .ok_or_else(|| StaydeskError::not_found("template", template_id))?;
        let guest = self
            .storage
            .get_guest(guest_id)
            .await?
            .ok_or_else(|| StaydeskError::not_found("guest", guest_id))?;
        let reservation = match reservation_id {
            Some(id) => Some(
                self.storage
                    .get_reservation(id)
                    .await?
                    .ok_or_else(|| StaydeskError::not_found("reservation", id))?,
            ),
            None => None,
        };
        if let Some(r) = &reservation {
            if r.guest_id != guest.id {
                return Err(StaydeskError::Validation(format!(
                    "reservation `{}` does not belong to guest `{}`",
                    r.id, guest.id
                )));
            }
        }

        let rule = template.trigger.unwrap_or_else(TriggerRule::manual);
        self.apply_rule(&template, &rule, &guest.id, reservation.as_ref(), guest.verified_at)
            .await
    }

    /// Re-resolve every check-in, check-out, and verification template for a
    /// reservation after it was created or changed.
    pub async fn on_reservation_changed(
        &self,
        reservation: &Reservation,
    ) -> Result<Vec<ScheduleResult>, StaydeskError> {
        require_storable("check_in", reservation.check_in)?;
        require_storable("check_out", reservation.check_out)?;
        self.storage.upsert_reservation(reservation).await?;
        let verified_at = self
            .storage
            .get_guest(&reservation.guest_id)
            .await?
            .and_then(|g| g.verified_at);

        let mut results = Vec::new();
        for event in [TriggerEvent::CheckIn, TriggerEvent::CheckOut, TriggerEvent::Verification] {
            results.extend(
                self.resolve_event(event, &reservation.guest_id, reservation, verified_at)
                    .await?,
            );
        }
        Ok(results)
    }

    /// Record a completed verification and schedule the verification
    /// templates for the guest's latest reservation.
    pub async fn on_verification_completed(
        &self,
        guest_id: &str,
        verified_at: DateTime<Utc>,
    ) -> Result<Vec<ScheduleResult>, StaydeskError> {
        require_storable("verified_at", Some(verified_at))?;
        let mut guest = self
            .storage
            .get_guest(guest_id)
            .await?
            .ok_or_else(|| StaydeskError::not_found("guest", guest_id))?;
        guest.verified_at = Some(verified_at);
        self.storage.upsert_guest(&guest).await?;

        let Some(reservation) = self
            .storage
            .reservations_for_guest(guest_id)
            .await?
            .into_iter()
            .next()
        else {
            info!(guest_id, "verification recorded; guest has no reservation to schedule against");
            return Ok(Vec::new());
        };

        self.resolve_event(TriggerEvent::Verification, guest_id, &reservation, Some(verified_at))
            .await
    }

    /// Store a new or changed guest record. Pending messages render against
    /// the latest guest data at dispatch time, so nothing is rescheduled.
    pub async fn on_guest_changed(&self, guest: &Guest) -> Result<(), StaydeskError> {
        self.storage.upsert_guest(guest).await
    }

    pub async fn on_property_changed(&self, property: &Property) -> Result<(), StaydeskError> {
        self.storage.upsert_property(property).await
    }

    async fn resolve_event(
        &self,
        event: TriggerEvent,
        guest_id: &str,
        reservation: &Reservation,
        verified_at: Option<DateTime<Utc>>,
    ) -> Result<Vec<ScheduleResult>, StaydeskError> {
        let templates = shadow_account_wide(
            self.storage
                .templates_for_event(event, &reservation.property_id)
                .await?,
        );

        let mut results = Vec::with_capacity(templates.len());
        for template in &templates {
            let Some(rule) = template.trigger else {
                continue;
            };
            results.push(
                self.apply_rule(template, &rule, guest_id, Some(reservation), verified_at)
                    .await?,
            );
        }
        Ok(results)
    }

    async fn apply_rule(
        &self,
        template: &MessageTemplate,
        rule: &TriggerRule,
        guest_id: &str,
        reservation: Option<&Reservation>,
        verified_at: Option<DateTime<Utc>>,
    ) -> Result<ScheduleResult, StaydeskError> {
        let fire_at = match resolve(rule, reservation, verified_at) {
            Resolution::Fire(at) => Some(at),
            Resolution::Manual => None,
            Resolution::Unresolvable(reason) => {
                info!(
                    template_id = %template.id,
                    guest_id,
                    reservation_id = reservation.map(|r| r.id.as_str()),
                    %reason,
                    "trigger deferred"
                );
                let key = ScheduledMessage::key_for(
                    &template.id,
                    guest_id,
                    reservation.map(|r| r.id.as_str()),
                );
                self.withdraw_pending(&key, reason).await?;
                return Ok(ScheduleResult::Deferred {
                    template_id: template.id.clone(),
                    reason,
                });
            }
        };

        let message = ScheduledMessage::new(
            template.id.clone(),
            guest_id,
            reservation.map(|r| r.id.clone()),
            fire_at,
            Utc::now(),
        );

        Ok(match self.storage.upsert_scheduled(&message).await? {
            UpsertOutcome::Inserted(message) => {
                debug!(id = %message.id, template_id = %template.id, "message scheduled");
                ScheduleResult::Scheduled { message }
            }
            UpsertOutcome::Superseded(message) => {
                debug!(id = %message.id, template_id = %template.id, "fire time superseded");
                ScheduleResult::Superseded { message }
            }
            UpsertOutcome::InFlight { id } => {
                info!(%id, template_id = %template.id, "record is being dispatched; not rescheduled");
                ScheduleResult::InFlight { id }
            }
        })
    }

    /// Cancel the pending record for `key` after its anchor went away, so a
    /// stale fire time is never sent. A record being dispatched is left alone.
    async fn withdraw_pending(
        &self,
        key: &str,
        reason: UnresolvedReason,
    ) -> Result<(), StaydeskError> {
        let Some(pending) = self.storage.pending_for_key(key).await? else {
            return Ok(());
        };
        let claim = match self.storage.claim(&pending.id, Utc::now(), self.claim_ttl).await? {
            ClaimOutcome::Claimed(claim) => claim,
            _ => {
                info!(id = %pending.id, "pending record is busy or resolved; not withdrawn");
                return Ok(());
            }
        };
        let note = format!("withdrawn: {reason}");
        if self
            .storage
            .complete(&claim, MessageState::Cancelled, Utc::now(), Some(&note), false)
            .await?
        {
            info!(id = %pending.id, %reason, "pending record withdrawn");
        }
        Ok(())
    }

    // --- Queries ---

    /// Pending records, fire time ascending, manual records last.
    pub async fn list_scheduled(&self) -> Result<Vec<ScheduledMessage>, StaydeskError> {
        self.storage.list_scheduled().await
    }

    pub async fn get(&self, id: &str) -> Result<ScheduledMessage, StaydeskError> {
        self.storage
            .get_message(id)
            .await?
            .ok_or_else(|| StaydeskError::not_found("scheduled message", id))
    }

    // --- Operator actions ---

    /// Cancel a pending record.
    pub async fn cancel(&self, id: &str) -> Result<ScheduledMessage, StaydeskError> {
        let claim = self.claim_for_action(id).await?;
        let now = Utc::now();
        if !self
            .storage
            .complete(&claim, MessageState::Cancelled, now, None, false)
            .await?
        {
            return Err(StaydeskError::ActionInProgress { id: id.to_string() });
        }
        info!(id, "scheduled message cancelled");
        self.get(id).await
    }

    /// Dispatch a pending record right now and wait for the outcome.
    ///
    /// A failed delivery is persisted as `failed` and then returned as
    /// `StaydeskError::Delivery`. Sending a record that failed retryably
    /// creates and dispatches a fresh record with the same template,
    /// recipient, and links; the failed record is left as it is.
    pub async fn send_now(&self, id: &str) -> Result<ScheduledMessage, StaydeskError> {
        let claim = match self.claim_for_action(id).await {
            Ok(claim) => claim,
            Err(StaydeskError::AlreadyResolved {
                state: MessageState::Failed,
                ..
            }) if self.get(id).await?.retryable => return self.resend(id).await,
            Err(e) => return Err(e),
        };
        self.send_claimed(&claim).await
    }

    async fn send_claimed(&self, claim: &Claim) -> Result<ScheduledMessage, StaydeskError> {
        let id = &claim.message.id;
        match self.dispatch_claimed(claim).await? {
            DispatchOutcome::Sent { .. } => self.get(id).await,
            DispatchOutcome::Failed(failure) => Err(StaydeskError::Delivery {
                id: id.clone(),
                failure,
            }),
        }
    }

    async fn resend(&self, failed_id: &str) -> Result<ScheduledMessage, StaydeskError> {
        let failed = self.get(failed_id).await?;
        let mut message = ScheduledMessage::new(
            &failed.template_id,
            &failed.guest_id,
            failed.reservation_id.clone(),
            None,
            Utc::now(),
        );
        message.contract_id = failed.contract_id.clone();
        self.storage.insert_message(&message).await?;
        info!(id = %message.id, failed_id, "retrying failed message as a new record");
        let claim = self.claim_for_action(&message.id).await?;
        self.send_claimed(&claim).await
    }

    /// Create a one-off record for a template and send it immediately.
    ///
    /// The record is exempt from deduplication so it never supersedes a
    /// trigger-scheduled message for the same template.
    pub async fn send_adhoc(
        &self,
        template_id: &str,
        guest_id: &str,
        reservation_id: Option<&str>,
        contract_id: Option<&str>,
    ) -> Result<ScheduledMessage, StaydeskError> {
        if self.storage.get_template(template_id).await?.is_none() {
            return Err(StaydeskError::not_found("template", template_id));
        }
        if self.storage.get_guest(guest_id).await?.is_none() {
            return Err(StaydeskError::not_found("guest", guest_id));
        }
        let mut message = ScheduledMessage::new(
            template_id,
            guest_id,
            reservation_id.map(str::to_string),
            None,
            Utc::now(),
        );
        message.contract_id = contract_id.map(str::to_string);
        self.storage.insert_message(&message).await?;
        debug!(id = %message.id, template_id, "ad-hoc message created");
        self.send_now(&message.id).await
    }

    async fn claim_for_action(&self, id: &str) -> Result<Claim, StaydeskError> {
        match self.storage.claim(id, Utc::now(), self.claim_ttl).await? {
            ClaimOutcome::Claimed(claim) => Ok(claim),
            ClaimOutcome::Resolved(state) => Err(StaydeskError::AlreadyResolved {
                id: id.to_string(),
                state,
            }),
            ClaimOutcome::Busy => Err(StaydeskError::ActionInProgress { id: id.to_string() }),
            ClaimOutcome::Missing => Err(StaydeskError::not_found("scheduled message", id)),
        }
    }

    /// Dispatch a claimed record and write the outcome.
    ///
    /// If dispatch itself errors, the claim is released so the record can be
    /// retried, and the error is returned.
    async fn dispatch_claimed(&self, claim: &Claim) -> Result<DispatchOutcome, StaydeskError> {
        let message = &claim.message;
        let outcome = match self.dispatcher.dispatch(message).await {
            Ok(outcome) => outcome,
            Err(e) => {
                if let Err(release_err) = self.storage.release(claim).await {
                    warn!(id = %message.id, error = %release_err, "failed to release claim");
                }
                return Err(e);
            }
        };

        let now = Utc::now();
        let (state, last_error, retryable) = match &outcome {
            DispatchOutcome::Sent { .. } => (MessageState::Sent, None, false),
            DispatchOutcome::Failed(failure) => (
                MessageState::Failed,
                Some(failure.to_string()),
                failure.retryable,
            ),
        };
        let recorded = self
            .storage
            .complete(claim, state, now, last_error.as_deref(), retryable)
            .await?;
        if !recorded {
            warn!(id = %message.id, "claim expired during dispatch; outcome not recorded");
            return Err(StaydeskError::ActionInProgress {
                id: message.id.clone(),
            });
        }

        match &outcome {
            DispatchOutcome::Sent { channels } => {
                info!(id = %message.id, ?channels, "message sent");
                // The send is committed; a contract that fails to advance
                // stays where it is.
                if let Some(contract_id) = &message.contract_id {
                    if let Err(e) = self.advance_contract(contract_id).await {
                        warn!(id = %message.id, contract_id, error = %e, "contract not advanced after send");
                    }
                }
            }
            DispatchOutcome::Failed(failure) => {
                warn!(id = %message.id, %failure, retryable = failure.retryable, "message failed");
            }
        }
        Ok(outcome)
    }

    /// A delivered contract message moves a `generated` contract forward.
    async fn advance_contract(&self, contract_id: &str) -> Result<(), StaydeskError> {
        let Some(contract) = self.storage.get_contract(contract_id).await? else {
            warn!(contract_id, "delivered message references a missing contract");
            return Ok(());
        };
        if contract.status != ContractStatus::Generated {
            return Ok(());
        }
        let mut next = contract;
        next.status = ContractStatus::SentForSigning;
        if self
            .storage
            .compare_and_set_contract(&next, ContractStatus::Generated)
            .await?
        {
            info!(contract_id, "contract sent for signing");
        }
        Ok(())
    }

    // --- Sweep ---

    /// Dispatch every due record once. Failures are isolated per record.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, StaydeskError> {
        let due = self.storage.due_messages(now, self.batch_size).await?;
        let mut report = SweepReport {
            due: due.len(),
            ..SweepReport::default()
        };
        if due.is_empty() {
            return Ok(report);
        }

        let items: Vec<SweepItem> = stream::iter(due)
            .map(|message| self.sweep_one(message, now))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for item in items {
            match item {
                SweepItem::Sent => report.sent += 1,
                SweepItem::Failed => report.failed += 1,
                SweepItem::Skipped => report.skipped += 1,
                SweepItem::Error => report.errors += 1,
            }
        }
        info!(
            due = report.due,
            sent = report.sent,
            failed = report.failed,
            skipped = report.skipped,
            errors = report.errors,
            "sweep complete"
        );
        Ok(report)
    }

    async fn sweep_one(&self, message: ScheduledMessage, now: DateTime<Utc>) -> SweepItem {
        let claim = match self.storage.claim(&message.id, now, self.claim_ttl).await {
            Ok(ClaimOutcome::Claimed(claim)) => claim,
            Ok(_) => {
                debug!(id = %message.id, "skipped: claimed or resolved elsewhere");
                return SweepItem::Skipped;
            }
            Err(e) => {
                warn!(id = %message.id, error = %e, "claim failed");
                return SweepItem::Error;
            }
        };
        match self.dispatch_claimed(&claim).await {
            Ok(DispatchOutcome::Sent { .. }) => SweepItem::Sent,
            Ok(DispatchOutcome::Failed(_)) => SweepItem::Failed,
            Err(e) => {
                warn!(id = %message.id, error = %e, "dispatch error");
                SweepItem::Error
            }
        }
    }
}

/// Drop account-wide templates that a property-specific template of the
/// same kind overrides.
fn shadow_account_wide(templates: Vec<MessageTemplate>) -> Vec<MessageTemplate> {
    let overridden: HashSet<String> = templates
        .iter()
        .filter(|t| t.property_id.is_some())
        .map(|t| t.kind.to_string())
        .collect();
    templates
        .into_iter()
        .filter(|t| t.property_id.is_some() || !overridden.contains(t.kind.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::TimeZone;
    use staydesk_core::types::{Channel, Direction, OffsetUnit, TemplateKind};
    use staydesk_core::types::Contract;
    use staydesk_core::{ContractStore, DirectoryStore, TemplateStore};
    use staydesk_test_utils::TestHarness;
    use staydesk_test_utils::fixtures;
    use staydesk_test_utils::harness::{GUEST, PROPERTY, RESERVATION};
    use tracing_test::traced_test;

    use super::*;

    fn template(kind: TemplateKind, property_id: Option<&str>) -> MessageTemplate {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        MessageTemplate {
            id: format!("{kind}-{}", property_id.unwrap_or("all")),
            name: kind.to_string(),
            kind,
            property_id: property_id.map(String::from),
            subject: None,
            body: "hi".into(),
            channels: BTreeSet::from([Channel::Sms]),
            language: "en".into(),
            active: true,
            trigger: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[traced_test]
    #[tokio::test]
    async fn unresolvable_trigger_is_deferred_and_logged() {
        let h = TestHarness::new().await.unwrap();
        h.seed_stay().await.unwrap();
        let mut open_ended = fixtures::reservation("r2", GUEST, PROPERTY);
        open_ended.check_out = None;
        h.storage.upsert_reservation(&open_ended).await.unwrap();

        let template = MessageTemplate::from_draft(
            fixtures::draft(
                TemplateKind::Checkout,
                &[Channel::Sms],
                Some(fixtures::rule(
                    TriggerEvent::CheckOut,
                    2,
                    OffsetUnit::Hours,
                    Direction::After,
                )),
            ),
            Utc::now(),
        )
        .unwrap();
        h.storage.insert_template(&template).await.unwrap();

        let dispatcher = Dispatcher::new(h.storage.clone(), h.gateway.clone(), h.config.render.clone());
        let scheduler = Scheduler::new(h.storage.clone(), dispatcher, &h.config.engine);
        let result = scheduler
            .schedule_template(&template.id, GUEST, Some("r2"))
            .await
            .unwrap();

        assert_eq!(
            result,
            ScheduleResult::Deferred {
                template_id: template.id.clone(),
                reason: UnresolvedReason::MissingCheckOut,
            }
        );
        assert!(scheduler.list_scheduled().await.unwrap().is_empty());
        assert!(logs_contain("trigger deferred"));
    }

    #[traced_test]
    #[tokio::test]
    async fn send_stands_when_the_linked_contract_cannot_advance() {
        let h = TestHarness::new().await.unwrap();
        h.seed_stay().await.unwrap();
        let template = MessageTemplate::from_draft(
            fixtures::draft(TemplateKind::ContractReady, &[Channel::Sms], None),
            Utc::now(),
        )
        .unwrap();
        h.storage.insert_template(&template).await.unwrap();
        let contract = Contract::generated(GUEST, RESERVATION, Utc::now());
        h.storage.insert_contract(&contract).await.unwrap();

        // An unreadable row makes every contract lookup fail.
        let raw = rusqlite::Connection::open(&h.config.storage.database_path).unwrap();
        raw.execute(
            "UPDATE contracts SET created_at = 'garbled' WHERE id = ?1",
            [&contract.id],
        )
        .unwrap();
        drop(raw);

        let dispatcher = Dispatcher::new(h.storage.clone(), h.gateway.clone(), h.config.render.clone());
        let scheduler = Scheduler::new(h.storage.clone(), dispatcher, &h.config.engine);
        let sent = scheduler
            .send_adhoc(&template.id, GUEST, Some(RESERVATION), Some(&contract.id))
            .await
            .unwrap();

        assert_eq!(sent.state, MessageState::Sent);
        assert_eq!(h.gateway.delivered_count().await, 1);
        assert!(logs_contain("contract not advanced after send"));
    }

    #[tokio::test]
    async fn reservation_of_another_guest_is_rejected() {
        let h = TestHarness::new().await.unwrap();
        h.seed_stay().await.unwrap();
        h.storage
            .upsert_guest(&fixtures::guest("g2", "Noor"))
            .await
            .unwrap();
        let template = MessageTemplate::from_draft(
            fixtures::draft(TemplateKind::Welcome, &[Channel::Sms], None),
            Utc::now(),
        )
        .unwrap();
        h.storage.insert_template(&template).await.unwrap();

        let dispatcher = Dispatcher::new(h.storage.clone(), h.gateway.clone(), h.config.render.clone());
        let scheduler = Scheduler::new(h.storage.clone(), dispatcher, &h.config.engine);
        let err = scheduler
            .schedule_template(&template.id, "g2", Some(RESERVATION))
            .await
            .unwrap_err();
        assert!(matches!(err, StaydeskError::Validation(_)));
    }

    #[test]
    fn property_templates_shadow_account_wide_ones_of_the_same_kind() {
        let kept = shadow_account_wide(vec![
            template(TemplateKind::Checkin, Some("p1")),
            template(TemplateKind::Checkin, None),
            template(TemplateKind::Checkout, None),
        ]);
        let ids: Vec<_> = kept.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["checkin-p1", "checkout-all"]);
    }
}
