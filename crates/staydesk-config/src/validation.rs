// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks the constraints serde cannot express. All problems are collected
//! before returning so a single run reports everything that is wrong.

use crate::diagnostic::ConfigError;
use crate::model::StaydeskConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Largest UTC offset in use anywhere (+14:00).
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

pub fn validate_config(config: &StaydeskConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.service.log_level.as_str()) {
        errors.push(ConfigError::invalid(
            "service.log_level",
            format!(
                "must be one of {}, got `{}`",
                LOG_LEVELS.join(", "),
                config.service.log_level
            ),
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::invalid("storage.database_path", "must not be empty"));
    }

    let engine = &config.engine;
    for (field, value) in [
        ("engine.sweep_interval_secs", engine.sweep_interval_secs),
        ("engine.claim_ttl_secs", engine.claim_ttl_secs),
    ] {
        if value == 0 {
            errors.push(ConfigError::invalid(field, "must be at least 1"));
        }
    }
    for (field, value) in [
        ("engine.sweep_batch_size", engine.sweep_batch_size),
        ("engine.sweep_concurrency", engine.sweep_concurrency),
        ("engine.fanout_concurrency", engine.fanout_concurrency),
    ] {
        if value == 0 {
            errors.push(ConfigError::invalid(field, "must be at least 1"));
        }
    }

    let render = &config.render;
    if render.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
        errors.push(ConfigError::invalid(
            "render.utc_offset_minutes",
            format!(
                "must be within ±{MAX_UTC_OFFSET_MINUTES}, got {}",
                render.utc_offset_minutes
            ),
        ));
    }
    for (field, url) in [
        ("render.verification_url", &render.verification_url),
        ("render.contract_url", &render.contract_url),
    ] {
        if !url.contains("{token}") {
            errors.push(ConfigError::invalid(field, "must contain a `{token}` placeholder"));
        }
    }
    if render.date_format.trim().is_empty() {
        errors.push(ConfigError::invalid("render.date_format", "must not be empty"));
    }
    if render.time_format.trim().is_empty() {
        errors.push(ConfigError::invalid("render.time_format", "must not be empty"));
    }

    if let Some(endpoint) = &config.relay.endpoint {
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            errors.push(ConfigError::invalid(
                "relay.endpoint",
                format!("must be an http(s) URL, got `{endpoint}`"),
            ));
        }
    }
    if config.relay.timeout_secs == 0 {
        errors.push(ConfigError::invalid("relay.timeout_secs", "must be at least 1"));
    }

    if config.documents.output_dir.trim().is_empty() {
        errors.push(ConfigError::invalid("documents.output_dir", "must not be empty"));
    }
    if config.documents.contract_body.trim().is_empty() {
        errors.push(ConfigError::invalid("documents.contract_body", "must not be empty"));
    }

    if config.invitations.body.trim().is_empty() {
        errors.push(ConfigError::invalid("invitations.body", "must not be empty"));
    }

    if config.api.enabled && config.api.host.parse::<std::net::IpAddr>().is_err() {
        errors.push(ConfigError::invalid(
            "api.host",
            format!("`{}` is not a valid IP address", config.api.host),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
