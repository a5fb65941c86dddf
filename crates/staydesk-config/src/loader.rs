// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `./staydesk.toml` > `~/.config/staydesk/staydesk.toml` >
//! `/etc/staydesk/staydesk.toml`, with `STAYDESK_` environment variables on top.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::StaydeskConfig;

/// Top-level sections, used to split environment variable names.
const SECTIONS: &[&str] = &[
    "service",
    "storage",
    "engine",
    "render",
    "relay",
    "documents",
    "invitations",
    "api",
];

pub(crate) const LOCAL_CONFIG: &str = "staydesk.toml";
pub(crate) const SYSTEM_CONFIG: &str = "/etc/staydesk/staydesk.toml";

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("staydesk").join("staydesk.toml"))
}

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/staydesk/staydesk.toml`
/// 3. `~/.config/staydesk/staydesk.toml`
/// 4. `./staydesk.toml`
/// 5. `STAYDESK_*` environment variables
pub fn load_config() -> Result<StaydeskConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<StaydeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(StaydeskConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<StaydeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(StaydeskConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the layered Figment before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(StaydeskConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Environment provider with explicit section mapping.
///
/// Only the first `_` after a known section name becomes a dot, so
/// `STAYDESK_ENGINE_CLAIM_TTL_SECS` maps to `engine.claim_ttl_secs`.
fn env_provider() -> Env {
    Env::prefixed("STAYDESK_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name to a dotted config path.
pub fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
