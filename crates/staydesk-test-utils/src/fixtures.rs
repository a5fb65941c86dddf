// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record builders shared by integration tests.

use std::collections::BTreeSet;

use chrono::{DateTime, TimeZone, Utc};
use staydesk_core::types::{
    Channel, Direction, Guest, OffsetUnit, Property, Reservation, TemplateDraft, TemplateKind,
    TriggerEvent, TriggerRule,
};

/// `2024-06-{day}T{hour}:00:00Z`.
pub fn june(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0)
        .single()
        .unwrap_or_else(|| panic!("invalid fixture date 2024-06-{day} {hour}:00"))
}

/// A verified-token guest reachable on email and phone.
pub fn guest(id: &str, name: &str) -> Guest {
    Guest {
        id: id.to_string(),
        full_name: Some(name.to_string()),
        email: Some(format!("{id}@guest.test")),
        phone: Some(format!("+316-{id}")),
        verification_token: Some(format!("tok-{id}")),
        token_issued_at: Some(june(1, 12)),
        verified_at: None,
    }
}

pub fn property(id: &str, name: &str) -> Property {
    Property {
        id: id.to_string(),
        name: name.to_string(),
        address: Some("1 Harbour Road".to_string()),
        owner_name: Some("Nadia".to_string()),
        owner_phone: Some("+31611111111".to_string()),
    }
}

/// Check-in June 10 15:00, check-out June 14 11:00.
pub fn reservation(id: &str, guest_id: &str, property_id: &str) -> Reservation {
    Reservation {
        id: id.to_string(),
        guest_id: guest_id.to_string(),
        property_id: property_id.to_string(),
        check_in: Some(june(10, 15)),
        check_out: Some(june(14, 11)),
    }
}

pub fn rule(event: TriggerEvent, offset: u32, unit: OffsetUnit, direction: Direction) -> TriggerRule {
    TriggerRule {
        event,
        offset,
        unit,
        direction,
    }
}

/// An account-wide draft. Email channels get a subject.
pub fn draft(kind: TemplateKind, channels: &[Channel], trigger: Option<TriggerRule>) -> TemplateDraft {
    let channels: BTreeSet<Channel> = channels.iter().copied().collect();
    TemplateDraft {
        name: format!("{kind} template"),
        subject: channels
            .contains(&Channel::Email)
            .then(|| "Your stay at {property_name}".to_string()),
        kind,
        property_id: None,
        body: "Hi {guest_name}, see you at {{property_name}}.".to_string(),
        channels,
        language: "en".to_string(),
        active: true,
        trigger,
    }
}
