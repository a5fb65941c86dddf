// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the storage traits.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use staydesk_config::model::StorageConfig;
use staydesk_core::types::{
    AdapterType, Claim, ClaimOutcome, Contract, ContractStatus, Guest, HealthStatus, Invitation,
    InvitationStatus, MessageState, MessageTemplate, Property, Reservation, ScheduledMessage,
    TemplateKind, TriggerEvent, UpsertOutcome,
};
use staydesk_core::{
    ContractStore, DirectoryStore, InvitationStore, PluginAdapter, ScheduleStore, StaydeskError,
    StorageAdapter, TemplateStore,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed storage adapter.
///
/// The database is opened on the first call to [`StorageAdapter::initialize`];
/// every other method fails until then.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// The connection is not opened until [`StorageAdapter::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, StaydeskError> {
        self.db.get().ok_or_else(|| StaydeskError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    async fn checkpoint(&self) -> Result<(), StaydeskError> {
        if let Some(db) = self.db.get() {
            db.connection()
                .call(|conn| -> Result<(), rusqlite::Error> {
                    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                    Ok(())
                })
                .await
                .map_err(map_tr_err)?;
            debug!("WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, StaydeskError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), StaydeskError> {
        self.checkpoint().await
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), StaydeskError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| StaydeskError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), StaydeskError> {
        self.db()?;
        self.checkpoint().await
    }
}

#[async_trait]
impl TemplateStore for SqliteStorage {
    async fn insert_template(&self, template: &MessageTemplate) -> Result<(), StaydeskError> {
        queries::templates::insert_template(self.db()?, template).await
    }

    async fn update_template(&self, template: &MessageTemplate) -> Result<(), StaydeskError> {
        queries::templates::update_template(self.db()?, template).await
    }

    async fn get_template(&self, id: &str) -> Result<Option<MessageTemplate>, StaydeskError> {
        queries::templates::get_template(self.db()?, id).await
    }

    async fn list_templates(
        &self,
        property_id: Option<&str>,
    ) -> Result<Vec<MessageTemplate>, StaydeskError> {
        queries::templates::list_templates(self.db()?, property_id).await
    }

    async fn find_active_by_kind(
        &self,
        kind: &TemplateKind,
        property_id: &str,
    ) -> Result<Option<MessageTemplate>, StaydeskError> {
        queries::templates::find_active_by_kind(self.db()?, kind, property_id).await
    }

    async fn templates_for_event(
        &self,
        event: TriggerEvent,
        property_id: &str,
    ) -> Result<Vec<MessageTemplate>, StaydeskError> {
        queries::templates::templates_for_event(self.db()?, event, property_id).await
    }
}

#[async_trait]
impl DirectoryStore for SqliteStorage {
    async fn upsert_guest(&self, guest: &Guest) -> Result<(), StaydeskError> {
        queries::directory::upsert_guest(self.db()?, guest).await
    }

    async fn upsert_reservation(&self, reservation: &Reservation) -> Result<(), StaydeskError> {
        queries::directory::upsert_reservation(self.db()?, reservation).await
    }

    async fn upsert_property(&self, property: &Property) -> Result<(), StaydeskError> {
        queries::directory::upsert_property(self.db()?, property).await
    }

    async fn get_guest(&self, id: &str) -> Result<Option<Guest>, StaydeskError> {
        queries::directory::get_guest(self.db()?, id).await
    }

    async fn get_reservation(&self, id: &str) -> Result<Option<Reservation>, StaydeskError> {
        queries::directory::get_reservation(self.db()?, id).await
    }

    async fn get_property(&self, id: &str) -> Result<Option<Property>, StaydeskError> {
        queries::directory::get_property(self.db()?, id).await
    }

    async fn reservations_for_guest(
        &self,
        guest_id: &str,
    ) -> Result<Vec<Reservation>, StaydeskError> {
        queries::directory::reservations_for_guest(self.db()?, guest_id).await
    }
}

#[async_trait]
impl ScheduleStore for SqliteStorage {
    async fn upsert_scheduled(
        &self,
        message: &ScheduledMessage,
    ) -> Result<UpsertOutcome, StaydeskError> {
        queries::scheduled::upsert_scheduled(self.db()?, message).await
    }

    async fn insert_message(&self, message: &ScheduledMessage) -> Result<(), StaydeskError> {
        queries::scheduled::insert_message(self.db()?, message).await
    }

    async fn get_message(&self, id: &str) -> Result<Option<ScheduledMessage>, StaydeskError> {
        queries::scheduled::get_message(self.db()?, id).await
    }

    async fn pending_for_key(
        &self,
        dedupe_key: &str,
    ) -> Result<Option<ScheduledMessage>, StaydeskError> {
        queries::scheduled::pending_for_key(self.db()?, dedupe_key).await
    }

    async fn list_scheduled(&self) -> Result<Vec<ScheduledMessage>, StaydeskError> {
        queries::scheduled::list_scheduled(self.db()?).await
    }

    async fn due_messages(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ScheduledMessage>, StaydeskError> {
        queries::scheduled::due_messages(self.db()?, now, limit).await
    }

    async fn claim(
        &self,
        id: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<ClaimOutcome, StaydeskError> {
        let expires_at = TimeDelta::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| StaydeskError::Internal(format!("claim ttl {ttl:?} out of range")))?;
        queries::scheduled::claim(self.db()?, id, now, expires_at).await
    }

    async fn complete(
        &self,
        claim: &Claim,
        state: MessageState,
        at: DateTime<Utc>,
        last_error: Option<&str>,
        retryable: bool,
    ) -> Result<bool, StaydeskError> {
        queries::scheduled::complete(self.db()?, claim, state, at, last_error, retryable).await
    }

    async fn release(&self, claim: &Claim) -> Result<(), StaydeskError> {
        queries::scheduled::release(self.db()?, claim).await
    }

    async fn messages_for_contract(
        &self,
        contract_id: &str,
    ) -> Result<Vec<ScheduledMessage>, StaydeskError> {
        queries::scheduled::messages_for_contract(self.db()?, contract_id).await
    }
}

#[async_trait]
impl ContractStore for SqliteStorage {
    async fn insert_contract(&self, contract: &Contract) -> Result<(), StaydeskError> {
        queries::contracts::insert_contract(self.db()?, contract).await
    }

    async fn get_contract(&self, id: &str) -> Result<Option<Contract>, StaydeskError> {
        queries::contracts::get_contract(self.db()?, id).await
    }

    async fn compare_and_set_contract(
        &self,
        contract: &Contract,
        expected: ContractStatus,
    ) -> Result<bool, StaydeskError> {
        queries::contracts::compare_and_set(self.db()?, contract, expected).await
    }
}

#[async_trait]
impl InvitationStore for SqliteStorage {
    async fn find_active_invitation(
        &self,
        property_id: &str,
        address_key: &str,
    ) -> Result<Option<Invitation>, StaydeskError> {
        queries::invitations::find_active(self.db()?, property_id, address_key).await
    }

    async fn insert_invitation(&self, invitation: &Invitation) -> Result<(), StaydeskError> {
        queries::invitations::insert_invitation(self.db()?, invitation).await
    }

    async fn set_invitation_status(
        &self,
        id: &str,
        status: InvitationStatus,
        at: DateTime<Utc>,
    ) -> Result<(), StaydeskError> {
        queries::invitations::set_status(self.db()?, id, status, at).await
    }
}
