// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Staydesk notification engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Staydesk configuration.
///
/// All sections are optional and default to values suitable for local use.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StaydeskConfig {
    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    /// Sweep cadence, claim lease, and parallelism caps.
    #[serde(default)]
    pub engine: EngineConfig,

    /// How template variables are localized and linked.
    #[serde(default)]
    pub render: RenderConfig,

    /// Outbound message gateway. Without an endpoint messages are logged, not sent.
    #[serde(default)]
    pub relay: RelayConfig,

    /// Contract document rendering.
    #[serde(default)]
    pub documents: DocumentsConfig,

    /// Wording of the invitation message sent by bulk invites.
    #[serde(default)]
    pub invitations: InvitationsConfig,

    #[serde(default)]
    pub api: ApiConfig,
}

/// Process identity and logging.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "staydesk".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("staydesk").join("staydesk.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("staydesk.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Scheduling engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Seconds between two sweeps of due messages.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Maximum number of due messages picked up by one sweep.
    #[serde(default = "default_sweep_batch_size")]
    pub sweep_batch_size: usize,

    /// Messages dispatched concurrently within one sweep.
    #[serde(default = "default_concurrency")]
    pub sweep_concurrency: usize,

    /// Lifetime of the per-record claim. A crashed holder's claim becomes
    /// re-claimable after this long.
    #[serde(default = "default_claim_ttl_secs")]
    pub claim_ttl_secs: u64,

    /// Targets processed concurrently by bulk operations.
    #[serde(default = "default_concurrency")]
    pub fanout_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval_secs(),
            sweep_batch_size: default_sweep_batch_size(),
            sweep_concurrency: default_concurrency(),
            claim_ttl_secs: default_claim_ttl_secs(),
            fanout_concurrency: default_concurrency(),
        }
    }
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_sweep_batch_size() -> usize {
    100
}

fn default_concurrency() -> usize {
    4
}

fn default_claim_ttl_secs() -> u64 {
    300
}

/// Template variable rendering configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RenderConfig {
    /// Offset from UTC, in minutes, used for localized dates and times.
    #[serde(default)]
    pub utc_offset_minutes: i32,

    /// `strftime` format for `*_date` and `*_expiry` variables.
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// `strftime` format for `*_time` variables.
    #[serde(default = "default_time_format")]
    pub time_format: String,

    /// Verification link; `{token}` is replaced by the guest's verification token.
    #[serde(default = "default_verification_url")]
    pub verification_url: String,

    /// Contract signing link; `{token}` is replaced by the guest's verification token.
    #[serde(default = "default_contract_url")]
    pub contract_url: String,

    /// How long a verification token stays valid after issuance.
    #[serde(default = "default_token_validity_days")]
    pub token_validity_days: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            date_format: default_date_format(),
            time_format: default_time_format(),
            verification_url: default_verification_url(),
            contract_url: default_contract_url(),
            token_validity_days: default_token_validity_days(),
        }
    }
}

fn default_date_format() -> String {
    "%d/%m/%Y".to_string()
}

fn default_time_format() -> String {
    "%H:%M".to_string()
}

fn default_verification_url() -> String {
    "https://app.staydesk.io/verify/{token}".to_string()
}

fn default_contract_url() -> String {
    "https://app.staydesk.io/verify/{token}?step=contract".to_string()
}

fn default_token_validity_days() -> u32 {
    7
}

/// HTTP relay gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Base URL of the relay. `None` selects the dry-run gateway.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Bearer token sent with every request.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_relay_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_secs: default_relay_timeout_secs(),
        }
    }
}

fn default_relay_timeout_secs() -> u64 {
    15
}

/// Contract document configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentsConfig {
    /// Directory rendered documents are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// URL prefix under which `output_dir` is served.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    #[serde(default = "default_contract_title")]
    pub contract_title: String,

    /// Contract text. Supports the same variables as message templates.
    #[serde(default = "default_contract_body")]
    pub contract_body: String,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            public_base_url: default_public_base_url(),
            contract_title: default_contract_title(),
            contract_body: default_contract_body(),
        }
    }
}

fn default_output_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("staydesk").join("documents"))
        .unwrap_or_else(|| std::path::PathBuf::from("documents"))
        .to_string_lossy()
        .into_owned()
}

fn default_public_base_url() -> String {
    "http://127.0.0.1:8420/documents".to_string()
}

fn default_contract_title() -> String {
    "Short-term rental agreement".to_string()
}

fn default_contract_body() -> String {
    "This agreement is made between {host_name} and {guest_name} for the stay at \
     {property_name}, {property_address}, from {check_in_date} {check_in_time} \
     to {check_out_date} {check_out_time}."
        .to_string()
}

/// Invitation message configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct InvitationsConfig {
    #[serde(default = "default_invitation_subject")]
    pub subject: String,

    /// Message body. `{property_name}` and `{role}` are substituted, in
    /// single or double braces; other placeholders render empty.
    #[serde(default = "default_invitation_body")]
    pub body: String,
}

impl Default for InvitationsConfig {
    fn default() -> Self {
        Self {
            subject: default_invitation_subject(),
            body: default_invitation_body(),
        }
    }
}

fn default_invitation_subject() -> String {
    "You have been invited to {property_name}".to_string()
}

fn default_invitation_body() -> String {
    "You have been added as {role} for {property_name}. Reply to this message to get started."
        .to_string()
}

/// HTTP API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    #[serde(default = "default_api_enabled")]
    pub enabled: bool,

    #[serde(default = "default_api_host")]
    pub host: String,

    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: default_api_enabled(),
            host: default_api_host(),
            port: default_api_port(),
        }
    }
}

fn default_api_enabled() -> bool {
    true
}

fn default_api_host() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    8420
}
