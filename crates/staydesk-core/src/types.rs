// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the engine, storage, and adapter crates.

use std::collections::BTreeSet;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::StaydeskError;

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter plugged into the engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Gateway,
    Storage,
    Renderer,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Whether `at` has a four-digit-year RFC 3339 form. Instants outside
/// years 0..=9999 cannot be persisted.
pub fn is_storable_instant(at: &DateTime<Utc>) -> bool {
    (0..=9999).contains(&at.year())
}

// --- Templates ---

/// Delivery channel for a message.
///
/// Ordering is the dispatch order: email first, then sms, then whatsapp.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Sms,
    Whatsapp,
}

/// What a template is for. Unknown names are kept as [`TemplateKind::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TemplateKind {
    Welcome,
    VerificationRequest,
    VerificationReminder,
    VerificationComplete,
    ContractReady,
    ContractReminder,
    ContractSigned,
    Checkin,
    DuringStay,
    Checkout,
    ReviewRequest,
    Cleaner,
    Custom(String),
}

impl TemplateKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Welcome => "welcome",
            Self::VerificationRequest => "verification_request",
            Self::VerificationReminder => "verification_reminder",
            Self::VerificationComplete => "verification_complete",
            Self::ContractReady => "contract_ready",
            Self::ContractReminder => "contract_reminder",
            Self::ContractSigned => "contract_signed",
            Self::Checkin => "checkin",
            Self::DuringStay => "during_stay",
            Self::Checkout => "checkout",
            Self::ReviewRequest => "review_request",
            Self::Cleaner => "cleaner",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateKind {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "welcome" => Self::Welcome,
            "verification_request" => Self::VerificationRequest,
            "verification_reminder" => Self::VerificationReminder,
            "verification_complete" => Self::VerificationComplete,
            "contract_ready" => Self::ContractReady,
            "contract_reminder" => Self::ContractReminder,
            "contract_signed" => Self::ContractSigned,
            "checkin" => Self::Checkin,
            "during_stay" => Self::DuringStay,
            "checkout" => Self::Checkout,
            "review_request" => Self::ReviewRequest,
            "cleaner" => Self::Cleaner,
            other => Self::Custom(other.to_string()),
        })
    }
}

impl From<String> for TemplateKind {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

impl From<TemplateKind> for String {
    fn from(kind: TemplateKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Domain event a trigger rule is anchored to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TriggerEvent {
    CheckIn,
    CheckOut,
    Verification,
    /// Never fired automatically; dispatched only by explicit operator action.
    #[strum(serialize = "none")]
    #[serde(rename = "none")]
    Manual,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OffsetUnit {
    Hours,
    Days,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Before,
    After,
}

/// Relative scheduling rule: "N hours/days before/after an event".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TriggerRule {
    pub event: TriggerEvent,
    #[serde(default)]
    pub offset: u32,
    #[serde(default = "default_offset_unit")]
    pub unit: OffsetUnit,
    #[serde(default = "default_direction")]
    pub direction: Direction,
}

fn default_offset_unit() -> OffsetUnit {
    OffsetUnit::Hours
}

fn default_direction() -> Direction {
    Direction::After
}

impl TriggerRule {
    /// A rule that only fires on explicit operator action.
    pub fn manual() -> Self {
        Self {
            event: TriggerEvent::Manual,
            offset: 0,
            unit: OffsetUnit::Hours,
            direction: Direction::After,
        }
    }

    pub fn is_manual(&self) -> bool {
        self.event == TriggerEvent::Manual
    }
}

/// Operator-editable fields of a template, used for create and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateDraft {
    pub name: String,
    pub kind: TemplateKind,
    /// `None` applies the template to every property of the account.
    #[serde(default)]
    pub property_id: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    pub body: String,
    pub channels: BTreeSet<Channel>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub trigger: Option<TriggerRule>,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_active() -> bool {
    true
}

impl TemplateDraft {
    /// Check the template invariants, reporting every problem at once.
    pub fn validate(&self) -> Result<(), StaydeskError> {
        let mut problems = Vec::new();

        if self.name.trim().is_empty() {
            problems.push("name must not be empty".to_string());
        }
        if self.body.trim().is_empty() {
            problems.push("body must not be empty".to_string());
        }
        if self.channels.is_empty() {
            problems.push("at least one channel is required".to_string());
        }
        if self.channels.contains(&Channel::Email)
            && self.subject.as_deref().is_none_or(|s| s.trim().is_empty())
        {
            problems.push("subject is required when the email channel is enabled".to_string());
        }
        if self.language.trim().is_empty() {
            problems.push("language must not be empty".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(StaydeskError::Validation(problems.join("; ")))
        }
    }
}

/// A stored message template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub id: String,
    pub name: String,
    pub kind: TemplateKind,
    pub property_id: Option<String>,
    pub subject: Option<String>,
    pub body: String,
    pub channels: BTreeSet<Channel>,
    pub language: String,
    pub active: bool,
    pub trigger: Option<TriggerRule>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MessageTemplate {
    /// Build a new template from a validated draft.
    pub fn from_draft(draft: TemplateDraft, now: DateTime<Utc>) -> Result<Self, StaydeskError> {
        draft.validate()?;
        Ok(Self {
            id: new_id(),
            name: draft.name,
            kind: draft.kind,
            property_id: draft.property_id,
            subject: draft.subject,
            body: draft.body,
            channels: draft.channels,
            language: draft.language,
            active: draft.active,
            trigger: draft.trigger,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace the editable fields, keeping identity and creation time.
    pub fn apply(&mut self, draft: TemplateDraft, now: DateTime<Utc>) -> Result<(), StaydeskError> {
        draft.validate()?;
        self.name = draft.name;
        self.kind = draft.kind;
        self.property_id = draft.property_id;
        self.subject = draft.subject;
        self.body = draft.body;
        self.channels = draft.channels;
        self.language = draft.language;
        self.active = draft.active;
        self.trigger = draft.trigger;
        self.updated_at = now;
        Ok(())
    }

    /// Editable view of this template.
    pub fn to_draft(&self) -> TemplateDraft {
        TemplateDraft {
            name: self.name.clone(),
            kind: self.kind.clone(),
            property_id: self.property_id.clone(),
            subject: self.subject.clone(),
            body: self.body.clone(),
            channels: self.channels.clone(),
            language: self.language.clone(),
            active: self.active,
            trigger: self.trigger,
        }
    }

    /// Whether this template applies to the given property.
    pub fn applies_to(&self, property_id: &str) -> bool {
        self.property_id.as_deref().is_none_or(|p| p == property_id)
    }
}

// --- Directory read models ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guest {
    pub id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub verification_token: Option<String>,
    #[serde(default)]
    pub token_issued_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub verified_at: Option<DateTime<Utc>>,
}

impl Guest {
    /// Recipient address for a channel, if the guest has one.
    pub fn address_for(&self, channel: Channel) -> Option<&str> {
        non_blank(match channel {
            Channel::Email => self.email.as_deref(),
            Channel::Sms | Channel::Whatsapp => self.phone.as_deref(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: String,
    pub guest_id: String,
    pub property_id: String,
    #[serde(default)]
    pub check_in: Option<DateTime<Utc>>,
    #[serde(default)]
    pub check_out: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub owner_name: Option<String>,
    #[serde(default)]
    pub owner_phone: Option<String>,
}

// --- Scheduled messages ---

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageState {
    Scheduled,
    Sent,
    Cancelled,
    Failed,
}

impl MessageState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Scheduled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledMessage {
    pub id: String,
    pub template_id: String,
    pub guest_id: String,
    pub reservation_id: Option<String>,
    pub contract_id: Option<String>,
    /// `None` for manual records, which only an operator can dispatch.
    pub fire_at: Option<DateTime<Utc>>,
    pub state: MessageState,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// A `failed` record whose failure may clear on another attempt.
    #[serde(default)]
    pub retryable: bool,
}

impl ScheduledMessage {
    pub fn new(
        template_id: impl Into<String>,
        guest_id: impl Into<String>,
        reservation_id: Option<String>,
        fire_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: new_id(),
            template_id: template_id.into(),
            guest_id: guest_id.into(),
            reservation_id,
            contract_id: None,
            fire_at,
            state: MessageState::Scheduled,
            created_at: now,
            resolved_at: None,
            last_error: None,
            retryable: false,
        }
    }

    /// Key under which at most one `scheduled` record may exist.
    pub fn dedupe_key(&self) -> String {
        Self::key_for(&self.template_id, &self.guest_id, self.reservation_id.as_deref())
    }

    /// Dedupe key of a record for this template, guest, and reservation.
    pub fn key_for(template_id: &str, guest_id: &str, reservation_id: Option<&str>) -> String {
        match reservation_id {
            Some(reservation) => format!("{template_id}:reservation:{reservation}"),
            None => format!("{template_id}:guest:{guest_id}"),
        }
    }
}

/// An exclusive, time-bounded right to resolve one scheduled message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub message: ScheduledMessage,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Result of trying to claim a scheduled message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed(Claim),
    /// The record already left `scheduled`.
    Resolved(MessageState),
    /// Someone else holds an unexpired claim.
    Busy,
    Missing,
}

/// Result of inserting a trigger-scheduled message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted(ScheduledMessage),
    /// An existing `scheduled` record for the same key had its fire time replaced.
    Superseded(ScheduledMessage),
    /// The existing record is claimed and being dispatched right now.
    InFlight { id: String },
}

/// One channel send handed to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub channel: Channel,
    pub address: String,
    pub subject: Option<String>,
    pub body: String,
}

/// Why a dispatch ended in `failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryFailure {
    /// First failing channel, `None` when the message could not be prepared at all.
    pub channel: Option<Channel>,
    pub reason: String,
    pub retryable: bool,
}

impl fmt::Display for DeliveryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.channel {
            Some(channel) => write!(f, "{channel}: {}", self.reason),
            None => f.write_str(&self.reason),
        }
    }
}

// --- Contracts ---

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Generated,
    SentForSigning,
    Signed,
    Expired,
}

/// Opaque reference to a rendered document, owned by the document renderer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentHandle(pub String);

impl fmt::Display for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub id: String,
    pub guest_id: String,
    pub reservation_id: String,
    pub status: ContractStatus,
    pub created_at: DateTime<Utc>,
    pub draft_document: Option<DocumentHandle>,
    pub signed_at: Option<DateTime<Utc>>,
    /// The guest's signature as recorded at signing. Never replaced.
    pub signature: Option<DocumentHandle>,
    /// The signed document offered for download. Present iff `status == Signed`.
    pub signed_document: Option<DocumentHandle>,
}

impl Contract {
    pub fn generated(
        guest_id: impl Into<String>,
        reservation_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: new_id(),
            guest_id: guest_id.into(),
            reservation_id: reservation_id.into(),
            status: ContractStatus::Generated,
            created_at: now,
            draft_document: None,
            signed_at: None,
            signature: None,
            signed_document: None,
        }
    }
}

/// Content handed to the document renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractDocument {
    pub contract_id: String,
    pub title: String,
    pub body: String,
}

/// Where a signed document can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub handle: DocumentHandle,
    pub url: String,
}

// --- Invitations ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Contact {
    /// Preferred channel and address: email when present, otherwise sms.
    pub fn preferred_route(&self) -> Option<(Channel, &str)> {
        non_blank(self.email.as_deref())
            .map(|a| (Channel::Email, a))
            .or_else(|| non_blank(self.phone.as_deref()).map(|a| (Channel::Sms, a)))
    }

    /// Normalised key identifying this contact for duplicate detection.
    pub fn address_key(&self) -> Option<String> {
        self.preferred_route().map(|(_, a)| a.to_lowercase())
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Sent,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: String,
    pub property_id: String,
    pub contact: Contact,
    pub address_key: String,
    pub role: String,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invitation {
    pub fn pending(
        property_id: impl Into<String>,
        contact: Contact,
        address_key: String,
        role: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: new_id(),
            property_id: property_id.into(),
            contact,
            address_key,
            role: role.into(),
            status: InvitationStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}
