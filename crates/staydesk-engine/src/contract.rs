// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contract lifecycle: `generated` → `sent_for_signing` → `signed`, with
//! `expired` as the terminal side exit.
//!
//! Every transition is a compare-and-set on the status the caller observed,
//! so two concurrent actions on one contract cannot both win.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use staydesk_config::model::{DocumentsConfig, RenderConfig};
use staydesk_core::types::{
    Contract, ContractDocument, ContractStatus, DeliveryFailure, DocumentHandle, DocumentRef,
    MessageState, ScheduledMessage, TemplateKind,
};
use staydesk_core::{DocumentRenderer, StaydeskError, StorageAdapter};
use tracing::{debug, info, warn};

use crate::context::ContextSnapshot;
use crate::interpolate::render;
use crate::scheduler::Scheduler;

/// A contract together with the message that carried it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractDelivery {
    pub contract: Contract,
    pub message: ScheduledMessage,
    /// Set when the message ended `failed`; the contract stays `generated`.
    pub failure: Option<DeliveryFailure>,
}

pub struct ContractLifecycle {
    storage: Arc<dyn StorageAdapter>,
    renderer: Arc<dyn DocumentRenderer>,
    scheduler: Arc<Scheduler>,
    render: RenderConfig,
    documents: DocumentsConfig,
}

impl ContractLifecycle {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        renderer: Arc<dyn DocumentRenderer>,
        scheduler: Arc<Scheduler>,
        render: RenderConfig,
        documents: DocumentsConfig,
    ) -> Self {
        Self {
            storage,
            renderer,
            scheduler,
            render,
            documents,
        }
    }

    /// Draft a contract for the guest's latest reservation and send it.
    pub async fn generate_and_schedule(
        &self,
        guest_id: &str,
    ) -> Result<ContractDelivery, StaydeskError> {
        if self.storage.get_guest(guest_id).await?.is_none() {
            return Err(StaydeskError::not_found("guest", guest_id));
        }
        let reservation = self
            .storage
            .reservations_for_guest(guest_id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                StaydeskError::Validation(format!(
                    "guest `{guest_id}` has no reservation to draft a contract for"
                ))
            })?;
        let template = self
            .storage
            .find_active_by_kind(&TemplateKind::ContractReady, &reservation.property_id)
            .await?
            .ok_or_else(|| {
                StaydeskError::not_found("template", TemplateKind::ContractReady.as_str())
            })?;

        let mut contract = Contract::generated(guest_id, reservation.id.clone(), Utc::now());
        let handle = self.render_document(&contract, None).await?;
        contract.draft_document = Some(handle);
        self.storage.insert_contract(&contract).await?;
        info!(contract_id = %contract.id, guest_id, "contract generated");

        let mut message = ScheduledMessage::new(
            template.id,
            guest_id,
            Some(reservation.id),
            None,
            Utc::now(),
        );
        message.contract_id = Some(contract.id.clone());
        self.storage.insert_message(&message).await?;

        self.deliver(&contract.id, &message.id).await
    }

    /// Send the contract again after a failed delivery.
    ///
    /// Reuses a still-pending linked message when there is one, otherwise
    /// creates a new one from the current `contract_ready` template.
    pub async fn retry_delivery(&self, contract_id: &str) -> Result<ContractDelivery, StaydeskError> {
        let contract = self
            .require_status(contract_id, &[ContractStatus::Generated], "retry delivery of")
            .await?;

        let pending = self
            .storage
            .messages_for_contract(contract_id)
            .await?
            .into_iter()
            .find(|m| m.state == MessageState::Scheduled);
        let message_id = match pending {
            Some(m) => m.id,
            None => {
                let reservation = self
                    .storage
                    .get_reservation(&contract.reservation_id)
                    .await?
                    .ok_or_else(|| StaydeskError::not_found("reservation", &contract.reservation_id))?;
                let template = self
                    .storage
                    .find_active_by_kind(&TemplateKind::ContractReady, &reservation.property_id)
                    .await?
                    .ok_or_else(|| {
                        StaydeskError::not_found("template", TemplateKind::ContractReady.as_str())
                    })?;
                let mut message = ScheduledMessage::new(
                    template.id,
                    contract.guest_id.clone(),
                    Some(reservation.id),
                    None,
                    Utc::now(),
                );
                message.contract_id = Some(contract.id.clone());
                self.storage.insert_message(&message).await?;
                message.id
            }
        };
        self.deliver(contract_id, &message_id).await
    }

    /// Record the guest's signature.
    pub async fn on_signed(
        &self,
        contract_id: &str,
        handle: DocumentHandle,
    ) -> Result<Contract, StaydeskError> {
        let current = self
            .require_status(contract_id, &[ContractStatus::SentForSigning], "sign")
            .await?;
        let mut next = current.clone();
        next.status = ContractStatus::Signed;
        next.signed_at = Some(Utc::now());
        next.signature = Some(handle.clone());
        next.signed_document = Some(handle);
        self.commit(&current, next, "sign").await
    }

    /// Re-render a signed contract with the signature recorded at signing
    /// embedded. Status, `signed_at` and the signature are left as they are.
    pub async fn regenerate_document(&self, contract_id: &str) -> Result<Contract, StaydeskError> {
        let current = self
            .require_status(contract_id, &[ContractStatus::Signed], "regenerate")
            .await?;
        let signature = current.signature.as_ref().ok_or_else(|| StaydeskError::InvalidTransition {
            entity: "contract",
            id: contract_id.to_string(),
            from: "signed without a signature".into(),
            action: "regenerate",
        })?;
        let handle = self.render_document(&current, Some(signature)).await?;
        let mut next = current.clone();
        next.signed_document = Some(handle);
        let updated = self.commit(&current, next, "regenerate").await?;
        info!(contract_id, "signed document regenerated");
        Ok(updated)
    }

    /// Where the signed document can be fetched from.
    pub async fn download(&self, contract_id: &str) -> Result<DocumentRef, StaydeskError> {
        let contract = self
            .require_status(contract_id, &[ContractStatus::Signed], "download")
            .await?;
        let handle = contract.signed_document.ok_or_else(|| StaydeskError::InvalidTransition {
            entity: "contract",
            id: contract_id.to_string(),
            from: "signed without a document".into(),
            action: "download",
        })?;
        let url = self.renderer.retrieval_url(&handle)?;
        Ok(DocumentRef { handle, url })
    }

    /// Expire an unsigned contract. Linked messages that are still pending
    /// are cancelled on a best-effort basis.
    pub async fn expire(&self, contract_id: &str) -> Result<Contract, StaydeskError> {
        let current = self
            .require_status(
                contract_id,
                &[ContractStatus::Generated, ContractStatus::SentForSigning],
                "expire",
            )
            .await?;
        let mut next = current.clone();
        next.status = ContractStatus::Expired;
        let expired = self.commit(&current, next, "expire").await?;

        for message in self.storage.messages_for_contract(contract_id).await? {
            if message.state != MessageState::Scheduled {
                continue;
            }
            if let Err(e) = self.scheduler.cancel(&message.id).await {
                debug!(contract_id, id = %message.id, error = %e, "linked message not cancelled");
            }
        }
        info!(contract_id, "contract expired");
        Ok(expired)
    }

    pub async fn get(&self, contract_id: &str) -> Result<Contract, StaydeskError> {
        self.storage
            .get_contract(contract_id)
            .await?
            .ok_or_else(|| StaydeskError::not_found("contract", contract_id))
    }

    async fn deliver(
        &self,
        contract_id: &str,
        message_id: &str,
    ) -> Result<ContractDelivery, StaydeskError> {
        let failure = match self.scheduler.send_now(message_id).await {
            Ok(_) => None,
            Err(StaydeskError::Delivery { failure, .. }) => {
                warn!(contract_id, %failure, "contract delivery failed; contract stays generated");
                Some(failure)
            }
            Err(e) => return Err(e),
        };
        Ok(ContractDelivery {
            contract: self.get(contract_id).await?,
            message: self.scheduler.get(message_id).await?,
            failure,
        })
    }

    async fn require_status(
        &self,
        contract_id: &str,
        allowed: &[ContractStatus],
        action: &'static str,
    ) -> Result<Contract, StaydeskError> {
        let contract = self.get(contract_id).await?;
        if !allowed.contains(&contract.status) {
            return Err(invalid(&contract, action));
        }
        Ok(contract)
    }

    async fn commit(
        &self,
        current: &Contract,
        next: Contract,
        action: &'static str,
    ) -> Result<Contract, StaydeskError> {
        if self
            .storage
            .compare_and_set_contract(&next, current.status)
            .await?
        {
            return Ok(next);
        }
        // Lost a race; report against whatever the status is now.
        let latest = self.get(&current.id).await?;
        Err(invalid(&latest, action))
    }

    async fn render_document(
        &self,
        contract: &Contract,
        signature: Option<&DocumentHandle>,
    ) -> Result<DocumentHandle, StaydeskError> {
        let snapshot = ContextSnapshot::load(
            &*self.storage,
            Some(&contract.guest_id),
            Some(&contract.reservation_id),
        )
        .await?;
        let vars = snapshot.variables(&self.render);
        let document = ContractDocument {
            contract_id: contract.id.clone(),
            title: render(&self.documents.contract_title, &vars),
            body: render(&self.documents.contract_body, &vars),
        };
        self.renderer.render(&document, signature).await
    }
}

fn invalid(contract: &Contract, action: &'static str) -> StaydeskError {
    StaydeskError::InvalidTransition {
        entity: "contract",
        id: contract.id.clone(),
        from: contract.status.to_string(),
        action,
    }
}
