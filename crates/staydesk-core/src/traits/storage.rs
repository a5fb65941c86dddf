// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage traits for persistence backends.
//!
//! The store is the single source of truth for scheduled messages. Every
//! mutation of a scheduled record goes through a [`Claim`] obtained from
//! [`ScheduleStore::claim`], so concurrent sweeps and operator actions never
//! resolve the same record twice.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StaydeskError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    Claim, ClaimOutcome, Contract, ContractStatus, Guest, Invitation, InvitationStatus,
    MessageState, MessageTemplate, Property, Reservation, ScheduledMessage, TemplateKind,
    TriggerEvent, UpsertOutcome,
};

#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn insert_template(&self, template: &MessageTemplate) -> Result<(), StaydeskError>;

    /// Overwrite an existing template. Fails with `NotFound` if it does not exist.
    async fn update_template(&self, template: &MessageTemplate) -> Result<(), StaydeskError>;

    async fn get_template(&self, id: &str) -> Result<Option<MessageTemplate>, StaydeskError>;

    /// Templates visible to a property (its own plus account-wide), or all when `None`.
    async fn list_templates(
        &self,
        property_id: Option<&str>,
    ) -> Result<Vec<MessageTemplate>, StaydeskError>;

    /// The active template of a kind for a property, property-specific preferred.
    async fn find_active_by_kind(
        &self,
        kind: &TemplateKind,
        property_id: &str,
    ) -> Result<Option<MessageTemplate>, StaydeskError>;

    /// Active templates whose trigger rule is anchored to `event` and that apply to the property.
    async fn templates_for_event(
        &self,
        event: TriggerEvent,
        property_id: &str,
    ) -> Result<Vec<MessageTemplate>, StaydeskError>;
}

#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn upsert_guest(&self, guest: &Guest) -> Result<(), StaydeskError>;
    async fn upsert_reservation(&self, reservation: &Reservation) -> Result<(), StaydeskError>;
    async fn upsert_property(&self, property: &Property) -> Result<(), StaydeskError>;

    async fn get_guest(&self, id: &str) -> Result<Option<Guest>, StaydeskError>;
    async fn get_reservation(&self, id: &str) -> Result<Option<Reservation>, StaydeskError>;
    async fn get_property(&self, id: &str) -> Result<Option<Property>, StaydeskError>;

    /// A guest's reservations, latest check-in first (undated ones last).
    async fn reservations_for_guest(
        &self,
        guest_id: &str,
    ) -> Result<Vec<Reservation>, StaydeskError>;
}

#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Insert a trigger-resolved record, or supersede the `scheduled` record
    /// sharing its dedupe key.
    async fn upsert_scheduled(
        &self,
        message: &ScheduledMessage,
    ) -> Result<UpsertOutcome, StaydeskError>;

    /// Insert a record that is exempt from deduplication (contract and ad-hoc sends).
    async fn insert_message(&self, message: &ScheduledMessage) -> Result<(), StaydeskError>;

    async fn get_message(&self, id: &str) -> Result<Option<ScheduledMessage>, StaydeskError>;

    /// The `scheduled` record holding `dedupe_key`, if any.
    async fn pending_for_key(
        &self,
        dedupe_key: &str,
    ) -> Result<Option<ScheduledMessage>, StaydeskError>;

    /// Every `scheduled` record, fire time ascending, manual records last.
    async fn list_scheduled(&self) -> Result<Vec<ScheduledMessage>, StaydeskError>;

    /// Unclaimed `scheduled` records with a fire time at or before `now`, oldest first.
    async fn due_messages(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ScheduledMessage>, StaydeskError>;

    /// Take the exclusive lease on a record. Expired leases may be taken over.
    async fn claim(
        &self,
        id: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<ClaimOutcome, StaydeskError>;

    /// Move a claimed record to a terminal state. Returns `false` when the
    /// claim was lost (expired and taken over) and nothing was written.
    /// `retryable` only has meaning for `failed`.
    async fn complete(
        &self,
        claim: &Claim,
        state: MessageState,
        at: DateTime<Utc>,
        last_error: Option<&str>,
        retryable: bool,
    ) -> Result<bool, StaydeskError>;

    /// Give up a claim without changing the record's state.
    async fn release(&self, claim: &Claim) -> Result<(), StaydeskError>;

    async fn messages_for_contract(
        &self,
        contract_id: &str,
    ) -> Result<Vec<ScheduledMessage>, StaydeskError>;
}

#[async_trait]
pub trait ContractStore: Send + Sync {
    async fn insert_contract(&self, contract: &Contract) -> Result<(), StaydeskError>;

    async fn get_contract(&self, id: &str) -> Result<Option<Contract>, StaydeskError>;

    /// Write `contract` only if the stored status still equals `expected`.
    async fn compare_and_set_contract(
        &self,
        contract: &Contract,
        expected: ContractStatus,
    ) -> Result<bool, StaydeskError>;
}

#[async_trait]
pub trait InvitationStore: Send + Sync {
    /// The pending or sent invitation for a property and contact address, if any.
    async fn find_active_invitation(
        &self,
        property_id: &str,
        address_key: &str,
    ) -> Result<Option<Invitation>, StaydeskError>;

    async fn insert_invitation(&self, invitation: &Invitation) -> Result<(), StaydeskError>;

    async fn set_invitation_status(
        &self,
        id: &str,
        status: InvitationStatus,
        at: DateTime<Utc>,
    ) -> Result<(), StaydeskError>;
}

/// Adapter for storage and persistence backends.
#[async_trait]
pub trait StorageAdapter:
    PluginAdapter + TemplateStore + DirectoryStore + ScheduleStore + ContractStore + InvitationStore
{
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), StaydeskError>;

    /// Closes the storage backend, flushing pending writes and releasing connections.
    async fn close(&self) -> Result<(), StaydeskError>;
}
