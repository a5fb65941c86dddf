// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Template authoring: create, edit, trigger management, and preview.
//!
//! Rule edits never touch messages already scheduled; they apply the next
//! time a reservation or verification event resolves the template.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use staydesk_config::model::RenderConfig;
use staydesk_core::types::{MessageTemplate, TemplateDraft, TriggerRule};
use staydesk_core::{StaydeskError, StorageAdapter};
use tracing::info;

use crate::context::ContextSnapshot;
use crate::interpolate::render;

/// A template rendered against sample or real records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preview {
    pub subject: Option<String>,
    pub body: String,
}

pub struct TemplateService {
    storage: Arc<dyn StorageAdapter>,
    render: RenderConfig,
}

impl TemplateService {
    pub fn new(storage: Arc<dyn StorageAdapter>, render: RenderConfig) -> Self {
        Self { storage, render }
    }

    pub async fn create(&self, draft: TemplateDraft) -> Result<MessageTemplate, StaydeskError> {
        let template = MessageTemplate::from_draft(draft, Utc::now())?;
        self.storage.insert_template(&template).await?;
        info!(template_id = %template.id, kind = %template.kind, "template created");
        Ok(template)
    }

    /// Replace every editable field of a template.
    pub async fn update(
        &self,
        id: &str,
        draft: TemplateDraft,
    ) -> Result<MessageTemplate, StaydeskError> {
        let mut template = self.get(id).await?;
        template.apply(draft, Utc::now())?;
        self.storage.update_template(&template).await?;
        info!(template_id = id, "template updated");
        Ok(template)
    }

    pub async fn attach_trigger(
        &self,
        id: &str,
        rule: TriggerRule,
    ) -> Result<MessageTemplate, StaydeskError> {
        self.edit_trigger(id, Some(rule)).await
    }

    pub async fn detach_trigger(&self, id: &str) -> Result<MessageTemplate, StaydeskError> {
        self.edit_trigger(id, None).await
    }

    async fn edit_trigger(
        &self,
        id: &str,
        rule: Option<TriggerRule>,
    ) -> Result<MessageTemplate, StaydeskError> {
        let mut template = self.get(id).await?;
        let mut draft = template.to_draft();
        draft.trigger = rule;
        template.apply(draft, Utc::now())?;
        self.storage.update_template(&template).await?;
        info!(template_id = id, trigger = ?rule, "template trigger changed");
        Ok(template)
    }

    pub async fn get(&self, id: &str) -> Result<MessageTemplate, StaydeskError> {
        self.storage
            .get_template(id)
            .await?
            .ok_or_else(|| StaydeskError::not_found("template", id))
    }

    /// Templates visible to `property_id` (its own plus account-wide), or
    /// every template when no property is given.
    pub async fn list(
        &self,
        property_id: Option<&str>,
    ) -> Result<Vec<MessageTemplate>, StaydeskError> {
        self.storage.list_templates(property_id).await
    }

    /// Render a template without sending it. Placeholders whose records are
    /// not supplied fall back to their defaults.
    pub async fn preview(
        &self,
        id: &str,
        guest_id: Option<&str>,
        reservation_id: Option<&str>,
    ) -> Result<Preview, StaydeskError> {
        let template = self.get(id).await?;
        let snapshot = ContextSnapshot::load(&*self.storage, guest_id, reservation_id).await?;
        if let (Some(id), None) = (guest_id, &snapshot.guest) {
            return Err(StaydeskError::not_found("guest", id));
        }
        if let (Some(id), None) = (reservation_id, &snapshot.reservation) {
            return Err(StaydeskError::not_found("reservation", id));
        }
        let vars = snapshot.variables(&self.render);
        Ok(Preview {
            subject: template.subject.as_deref().map(|s| render(s, &vars)),
            body: render(&template.body, &vars),
        })
    }
}
