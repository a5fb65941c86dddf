// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Variable interpolation for message templates.
//!
//! Placeholders are written `{key}` or `{{key}}` (inner whitespace allowed in
//! the double form). Both forms resolve identically and every occurrence is
//! replaced. Unknown keys render as the empty string, so rendering never
//! fails and never leaves a placeholder in the output.

use std::fmt::Write as _;
use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, Offset, TimeDelta, Utc};
use regex::{Captures, Regex};
use staydesk_config::model::RenderConfig;
use staydesk_core::types::{Guest, Property, Reservation};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}|\{([A-Za-z0-9_]+)\}").unwrap()
});

/// Every key the interpolator knows about.
pub const VARIABLES: &[&str] = &[
    "guest_name",
    "property_name",
    "check_in_date",
    "check_out_date",
    "check_in_time",
    "check_out_time",
    "property_address",
    "host_name",
    "host_phone",
    "verification_link",
    "contract_link",
    "verification_expiry",
    "contract_expiry",
];

/// Read-only view over the records a message is rendered against.
#[derive(Debug, Clone, Copy)]
pub struct VariableContext<'a> {
    pub guest: Option<&'a Guest>,
    pub reservation: Option<&'a Reservation>,
    pub property: Option<&'a Property>,
    pub settings: &'a RenderConfig,
}

impl<'a> VariableContext<'a> {
    /// A context with no records; every key renders its default.
    pub fn empty(settings: &'a RenderConfig) -> Self {
        Self {
            guest: None,
            reservation: None,
            property: None,
            settings,
        }
    }

    fn offset(&self) -> FixedOffset {
        self.settings
            .utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix())
    }

    fn local(&self, at: Option<DateTime<Utc>>, format: &str) -> String {
        let Some(at) = at else {
            return String::new();
        };
        let mut out = String::new();
        // Unknown strftime specifiers make `format` fail; render nothing then.
        if write!(out, "{}", at.with_timezone(&self.offset()).format(format)).is_err() {
            out.clear();
        }
        out
    }

    fn token(&self) -> Option<&'a str> {
        self.guest
            .and_then(|g| g.verification_token.as_deref())
            .filter(|t| !t.is_empty())
    }

    fn link(&self, template: &str) -> String {
        self.token()
            .map(|token| template.replace("{token}", token))
            .unwrap_or_default()
    }

    fn token_expiry(&self) -> String {
        if self.token().is_none() {
            return String::new();
        }
        let expires = self
            .guest
            .and_then(|g| g.token_issued_at)
            .zip(TimeDelta::try_days(i64::from(self.settings.token_validity_days)))
            .and_then(|(issued, validity)| issued.checked_add_signed(validity));
        self.local(expires, &self.settings.date_format)
    }

    /// Value of a single key. Unknown keys yield `""`.
    pub fn value(&self, key: &str) -> String {
        let settings = self.settings;
        match key {
            "guest_name" => non_empty(self.guest.and_then(|g| g.full_name.as_deref()))
                .unwrap_or("Guest")
                .to_string(),
            "property_name" => non_empty(self.property.map(|p| p.name.as_str()))
                .unwrap_or("Property")
                .to_string(),
            "check_in_date" => self.local(self.reservation.and_then(|r| r.check_in), &settings.date_format),
            "check_out_date" => {
                self.local(self.reservation.and_then(|r| r.check_out), &settings.date_format)
            }
            "check_in_time" => self.local(self.reservation.and_then(|r| r.check_in), &settings.time_format),
            "check_out_time" => {
                self.local(self.reservation.and_then(|r| r.check_out), &settings.time_format)
            }
            "property_address" => self
                .property
                .and_then(|p| p.address.clone())
                .unwrap_or_default(),
            "host_name" => non_empty(self.property.and_then(|p| p.owner_name.as_deref()))
                .unwrap_or("Host")
                .to_string(),
            "host_phone" => self
                .property
                .and_then(|p| p.owner_phone.clone())
                .unwrap_or_default(),
            "verification_link" => self.link(&settings.verification_url),
            "contract_link" => self.link(&settings.contract_url),
            "verification_expiry" | "contract_expiry" => self.token_expiry(),
            _ => String::new(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Replace every placeholder in `body` with its value from `context`.
pub fn render(body: &str, context: &VariableContext<'_>) -> String {
    render_with(body, |key| context.value(key))
}

/// Replace every placeholder in `body` with `lookup(key)`.
pub fn render_with(body: &str, lookup: impl Fn(&str) -> String) -> String {
    PLACEHOLDER
        .replace_all(body, |caps: &Captures<'_>| {
            let key = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            lookup(key)
        })
        .into_owned()
}
