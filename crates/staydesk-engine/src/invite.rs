// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bulk invitation of a contact to several properties.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use staydesk_config::model::InvitationsConfig;
use staydesk_core::types::{Channel, Contact, Delivery, Invitation, InvitationStatus};
use staydesk_core::{GatewayAdapter, StaydeskError, StorageAdapter};
use tracing::{debug, info, warn};

use crate::fanout::{FanoutResult, fanout};
use crate::interpolate::render_with;

pub struct InvitationService {
    storage: Arc<dyn StorageAdapter>,
    gateway: Arc<dyn GatewayAdapter>,
    config: InvitationsConfig,
    concurrency: usize,
}

impl InvitationService {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        gateway: Arc<dyn GatewayAdapter>,
        config: InvitationsConfig,
        concurrency: usize,
    ) -> Self {
        Self {
            storage,
            gateway,
            config,
            concurrency,
        }
    }

    /// Invite `contact` with `role` to every property in `property_ids`.
    ///
    /// Duplicate ids are collapsed. Each property succeeds or fails on its
    /// own; a failure on one never stops the others.
    pub async fn invite_contact(
        &self,
        contact: &Contact,
        role: &str,
        property_ids: Vec<String>,
    ) -> Result<FanoutResult<String>, StaydeskError> {
        let role = role.trim();
        if role.is_empty() {
            return Err(StaydeskError::Validation("role must not be empty".into()));
        }
        let Some((channel, address)) = contact.preferred_route() else {
            return Err(StaydeskError::Validation(
                "contact needs an email address or a phone number".into(),
            ));
        };
        let address_key = address.to_lowercase();

        let mut seen = HashSet::new();
        let targets: Vec<String> = property_ids
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();

        let route = Route {
            channel,
            address,
            address_key: &address_key,
        };
        let result = fanout(targets, self.concurrency, move |property_id| {
            self.invite_one(property_id, contact, role, route)
        })
        .await?;

        info!(
            role,
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            outcome = ?result.outcome(),
            "bulk invite finished"
        );
        Ok(result)
    }

    async fn invite_one(
        &self,
        property_id: String,
        contact: &Contact,
        role: &str,
        route: Route<'_>,
    ) -> Result<(), StaydeskError> {
        let property = self
            .storage
            .get_property(&property_id)
            .await?
            .ok_or_else(|| StaydeskError::not_found("property", &property_id))?;

        if let Some(existing) = self
            .storage
            .find_active_invitation(&property_id, route.address_key)
            .await?
        {
            return Err(StaydeskError::Validation(format!(
                "contact already invited to `{}` (invitation `{}` is {})",
                property.name, existing.id, existing.status
            )));
        }

        let invitation = Invitation::pending(
            property_id.clone(),
            contact.clone(),
            route.address_key.to_string(),
            role,
            Utc::now(),
        );
        self.storage.insert_invitation(&invitation).await?;

        let fill = |text: &str| {
            render_with(text, |key| match key {
                "property_name" => property.name.clone(),
                "role" => role.to_string(),
                _ => String::new(),
            })
        };
        let delivery = Delivery {
            channel: route.channel,
            address: route.address.to_string(),
            subject: match route.channel {
                Channel::Email => Some(fill(&self.config.subject)),
                Channel::Sms | Channel::Whatsapp => None,
            },
            body: fill(&self.config.body),
        };

        match self.gateway.send(&delivery).await {
            Ok(()) => {
                self.storage
                    .set_invitation_status(&invitation.id, InvitationStatus::Sent, Utc::now())
                    .await?;
                debug!(invitation_id = %invitation.id, property_id, "invitation sent");
                Ok(())
            }
            Err(e) => {
                warn!(invitation_id = %invitation.id, property_id, error = %e, "invitation failed");
                self.storage
                    .set_invitation_status(&invitation.id, InvitationStatus::Failed, Utc::now())
                    .await?;
                Err(e.into())
            }
        }
    }
}

#[derive(Clone, Copy)]
struct Route<'a> {
    channel: Channel,
    address: &'a str,
    address_key: &'a str,
}
