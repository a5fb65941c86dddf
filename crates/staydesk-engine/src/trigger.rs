// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trigger rule resolution: relative automation rules to absolute fire times.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use staydesk_core::types::{
    Direction, OffsetUnit, Reservation, TriggerEvent, TriggerRule, is_storable_instant,
};

/// Outcome of resolving a rule against the current facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Fire at this instant. May already be in the past; the next sweep sends it.
    Fire(DateTime<Utc>),
    /// The rule is never fired automatically.
    Manual,
    /// The anchor event has not happened (or is unknown) yet.
    Unresolvable(UnresolvedReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    NoReservation,
    MissingCheckIn,
    MissingCheckOut,
    NotVerified,
    OutOfRange,
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoReservation => "no reservation",
            Self::MissingCheckIn => "reservation has no check-in time",
            Self::MissingCheckOut => "reservation has no check-out time",
            Self::NotVerified => "guest is not verified",
            Self::OutOfRange => "fire time out of range",
        })
    }
}

/// Resolve `rule` against a reservation and the guest's verification time.
pub fn resolve(
    rule: &TriggerRule,
    reservation: Option<&Reservation>,
    verified_at: Option<DateTime<Utc>>,
) -> Resolution {
    let anchor = match rule.event {
        TriggerEvent::Manual => return Resolution::Manual,
        TriggerEvent::CheckIn => match reservation {
            None => Err(UnresolvedReason::NoReservation),
            Some(r) => r.check_in.ok_or(UnresolvedReason::MissingCheckIn),
        },
        TriggerEvent::CheckOut => match reservation {
            None => Err(UnresolvedReason::NoReservation),
            Some(r) => r.check_out.ok_or(UnresolvedReason::MissingCheckOut),
        },
        TriggerEvent::Verification => verified_at.ok_or(UnresolvedReason::NotVerified),
    };

    match anchor.and_then(|at| shift(at, rule)) {
        Ok(at) => Resolution::Fire(at),
        Err(reason) => Resolution::Unresolvable(reason),
    }
}

fn shift(at: DateTime<Utc>, rule: &TriggerRule) -> Result<DateTime<Utc>, UnresolvedReason> {
    let magnitude = i64::from(rule.offset);
    let delta = match rule.unit {
        OffsetUnit::Hours => TimeDelta::try_hours(magnitude),
        OffsetUnit::Days => TimeDelta::try_days(magnitude),
    }
    .ok_or(UnresolvedReason::OutOfRange)?;

    match rule.direction {
        Direction::Before => at.checked_sub_signed(delta),
        Direction::After => at.checked_add_signed(delta),
    }
    .filter(is_storable_instant)
    .ok_or(UnresolvedReason::OutOfRange)
}
