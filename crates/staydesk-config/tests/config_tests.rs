// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Staydesk configuration system.

use staydesk_config::diagnostic::ConfigError;
use staydesk_config::model::StaydeskConfig;
use staydesk_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

#[test]
fn full_toml_deserializes() {
    let toml = r#"
[service]
name = "staydesk-eu"
log_level = "debug"

[storage]
database_path = "/tmp/staydesk.db"
wal_mode = false

[engine]
sweep_interval_secs = 15
sweep_batch_size = 20
sweep_concurrency = 2
claim_ttl_secs = 90
fanout_concurrency = 8

[render]
utc_offset_minutes = 120
date_format = "%Y-%m-%d"
time_format = "%I:%M %p"
verification_url = "https://guests.example.com/v/{token}"
contract_url = "https://guests.example.com/c/{token}"
token_validity_days = 3

[relay]
endpoint = "https://relay.example.com"
api_key = "rk_test"
timeout_secs = 5

[documents]
output_dir = "/var/lib/staydesk/docs"
public_base_url = "https://files.example.com/docs"
contract_title = "Agreement"
contract_body = "Between {host_name} and {guest_name}"

[invitations]
subject = "Join {property_name}"
body = "Welcome aboard as {role}"

[api]
enabled = false
host = "0.0.0.0"
port = 9000
"#;

    let config = load_and_validate_str(toml).expect("valid config");
    assert_eq!(config.service.name, "staydesk-eu");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.engine.sweep_interval_secs, 15);
    assert_eq!(config.engine.claim_ttl_secs, 90);
    assert_eq!(config.engine.fanout_concurrency, 8);
    assert_eq!(config.render.utc_offset_minutes, 120);
    assert_eq!(config.render.token_validity_days, 3);
    assert_eq!(config.relay.endpoint.as_deref(), Some("https://relay.example.com"));
    assert_eq!(config.documents.contract_title, "Agreement");
    assert_eq!(config.invitations.body, "Welcome aboard as {role}");
    assert!(!config.api.enabled);
    assert_eq!(config.api.port, 9000);
}

#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("[service]\nname = \"x\"\n").expect("defaults fill in");
    assert_eq!(config.engine.sweep_interval_secs, 60);
    assert_eq!(config.engine.claim_ttl_secs, 300);
    assert_eq!(config.render.token_validity_days, 7);
    assert_eq!(config.render.date_format, "%d/%m/%Y");
    assert!(config.relay.endpoint.is_none());
    assert!(config.api.enabled);
    assert_eq!(config.api.port, 8420);
}

#[test]
fn unknown_key_gets_a_suggestion() {
    let toml = "[engine]\nsweep_intervall_secs = 5\n";
    let errors = load_and_validate_str(toml).expect_err("unknown key rejected");
    assert!(
        errors.iter().any(|e| matches!(
            e,
            ConfigError::UnknownKey { key, suggestion, valid_keys, .. }
                if key == "sweep_intervall_secs"
                    && suggestion.as_deref() == Some("sweep_interval_secs")
                    && valid_keys.contains("claim_ttl_secs")
        )),
        "got: {errors:?}"
    );
}

#[test]
fn unknown_top_level_section_is_rejected() {
    let errors = load_and_validate_str("[telegram]\nbot_token = \"x\"\n").unwrap_err();
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::UnknownKey { key, .. } if key == "telegram")),
        "got: {errors:?}"
    );
}

#[test]
fn wrong_type_is_reported() {
    let errors = load_and_validate_str("[api]\nport = \"eighty\"\n").unwrap_err();
    let text = errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n");
    assert!(text.contains("port"), "got: {text}");
}

#[test]
fn semantic_errors_are_collected() {
    let toml = r#"
[service]
log_level = "loud"

[engine]
claim_ttl_secs = 0
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert_eq!(errors.len(), 2, "got: {errors:?}");
    assert!(errors.iter().all(|e| matches!(e, ConfigError::Validation { .. })));
}

#[test]
fn figment_overrides_take_precedence() {
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    // Mirrors what STAYDESK_ENGINE_CLAIM_TTL_SECS produces after key mapping.
    let config: StaydeskConfig = Figment::new()
        .merge(Serialized::defaults(StaydeskConfig::default()))
        .merge(Toml::string("[engine]\nclaim_ttl_secs = 30\n"))
        .merge(("engine.claim_ttl_secs", 45))
        .extract()
        .expect("override merges");
    assert_eq!(config.engine.claim_ttl_secs, 45);
}

#[test]
fn explicit_path_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("staydesk.toml");
    std::fs::write(&path, "[api]\nport = 9100\n").unwrap();

    let config = load_and_validate_path(&path).expect("file loads");
    assert_eq!(config.api.port, 9100);
}

#[test]
fn diagnostics_render_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "prot".to_string(),
        suggestion: Some("port".to_string()),
        valid_keys: "enabled, host, port".to_string(),
        span: None,
        src: None,
    };
    let help = error.help().expect("help text").to_string();
    assert!(help.contains("did you mean `port`"));

    let mut buf = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut buf, &error)
        .expect("renders");
    assert!(buf.contains("prot"));
}
