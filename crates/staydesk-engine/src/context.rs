// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Loads the records a message is rendered against.

use staydesk_config::model::RenderConfig;
use staydesk_core::types::{Guest, Property, Reservation};
use staydesk_core::{DirectoryStore, StaydeskError};

use crate::interpolate::VariableContext;

/// Owned snapshot of a guest, their reservation, and its property.
#[derive(Debug, Clone, Default)]
pub struct ContextSnapshot {
    pub guest: Option<Guest>,
    pub reservation: Option<Reservation>,
    pub property: Option<Property>,
}

impl ContextSnapshot {
    /// Load a snapshot. Missing records are left empty; the caller decides
    /// whether an absent guest is fatal.
    pub async fn load<S>(
        store: &S,
        guest_id: Option<&str>,
        reservation_id: Option<&str>,
    ) -> Result<Self, StaydeskError>
    where
        S: DirectoryStore + ?Sized,
    {
        let guest = match guest_id {
            Some(id) => store.get_guest(id).await?,
            None => None,
        };
        let reservation = match reservation_id {
            Some(id) => store.get_reservation(id).await?,
            None => None,
        };
        let property = match &reservation {
            Some(r) => store.get_property(&r.property_id).await?,
            None => None,
        };
        Ok(Self {
            guest,
            reservation,
            property,
        })
    }

    pub fn variables<'a>(&'a self, settings: &'a RenderConfig) -> VariableContext<'a> {
        VariableContext {
            guest: self.guest.as_ref(),
            reservation: self.reservation.as_ref(),
            property: self.property.as_ref(),
            settings,
        }
    }
}
