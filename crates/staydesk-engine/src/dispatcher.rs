// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Renders a scheduled message and hands it to the gateway, one send per channel.

use std::sync::Arc;

use serde::Serialize;
use staydesk_config::model::RenderConfig;
use staydesk_core::types::{Channel, Delivery, DeliveryFailure, ScheduledMessage};
use staydesk_core::{GatewayAdapter, StaydeskError, StorageAdapter};
use tracing::{debug, warn};

use crate::context::ContextSnapshot;
use crate::interpolate::render;

/// Result of one dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Sent { channels: Vec<Channel> },
    Failed(DeliveryFailure),
}

impl DispatchOutcome {
    fn terminal(channel: Option<Channel>, reason: impl Into<String>) -> Self {
        Self::Failed(DeliveryFailure {
            channel,
            reason: reason.into(),
            retryable: false,
        })
    }
}

pub struct Dispatcher {
    storage: Arc<dyn StorageAdapter>,
    gateway: Arc<dyn GatewayAdapter>,
    render: RenderConfig,
}

impl Dispatcher {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        gateway: Arc<dyn GatewayAdapter>,
        render: RenderConfig,
    ) -> Self {
        Self {
            storage,
            gateway,
            render,
        }
    }

    /// Render and send `message` over every channel of its template.
    ///
    /// Channels are sent in fixed order (email, sms, whatsapp) and every
    /// channel is attempted. The message counts as sent only if all of them
    /// succeed; otherwise the first failing channel is reported. A missing or
    /// deactivated template fails the message terminally. Storage
    /// errors are returned as `Err` and leave the outcome undecided.
    pub async fn dispatch(
        &self,
        message: &ScheduledMessage,
    ) -> Result<DispatchOutcome, StaydeskError> {
        let Some(template) = self.storage.get_template(&message.template_id).await? else {
            return Ok(DispatchOutcome::terminal(
                None,
                format!("template `{}` no longer exists", message.template_id),
            ));
        };
        if !template.active {
            return Ok(DispatchOutcome::terminal(
                None,
                format!("template `{}` is inactive", template.id),
            ));
        }

        let snapshot = ContextSnapshot::load(
            &*self.storage,
            Some(&message.guest_id),
            message.reservation_id.as_deref(),
        )
        .await?;
        let Some(guest) = snapshot.guest.as_ref() else {
            return Ok(DispatchOutcome::terminal(
                None,
                format!("guest `{}` not found", message.guest_id),
            ));
        };

        let vars = snapshot.variables(&self.render);
        let body = render(&template.body, &vars);
        let subject = template.subject.as_deref().map(|s| render(s, &vars));

        let mut sent = Vec::new();
        let mut failures: Vec<DeliveryFailure> = Vec::new();

        for &channel in &template.channels {
            let Some(address) = guest.address_for(channel) else {
                failures.push(DeliveryFailure {
                    channel: Some(channel),
                    reason: format!("guest has no {channel} address"),
                    retryable: false,
                });
                continue;
            };

            let delivery = Delivery {
                channel,
                address: address.to_string(),
                subject: match channel {
                    Channel::Email => subject.clone(),
                    Channel::Sms | Channel::Whatsapp => None,
                },
                body: body.clone(),
            };

            match self.gateway.send(&delivery).await {
                Ok(()) => {
                    debug!(message_id = %message.id, %channel, "channel delivered");
                    sent.push(channel);
                }
                Err(e) => {
                    warn!(message_id = %message.id, %channel, error = %e, "channel delivery failed");
                    failures.push(DeliveryFailure {
                        channel: Some(channel),
                        reason: e.to_string(),
                        retryable: e.is_retryable(),
                    });
                }
            }
        }

        Ok(match failures.into_iter().next() {
            None => DispatchOutcome::Sent { channels: sent },
            Some(first) => DispatchOutcome::Failed(first),
        })
    }
}
