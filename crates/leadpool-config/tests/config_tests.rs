// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Leadpool configuration system.

use std::io::Write;

use figment::{Figment, providers::Serialized};
use leadpool_config::diagnostic::{ConfigError, suggest_key};
use leadpool_config::model::LeadpoolConfig;
use leadpool_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_leadpool_config() {
    let toml = r#"
[engine]
log_level = "debug"
max_in_flight = 16

[storage]
database_path = "/tmp/leadpool-test.db"
wal_mode = false
busy_timeout_ms = 250

[allocation]
low_water_percent = 10.0
max_retries = 5
retry_backoff_ms = 5

[normalize]
default_platform = "telegram"
trunk_prefixes = [{ from = "8", to = "7", length = 11 }]

[[categories]]
slug = "telegram"
name = "Telegram"
base_quota = 50

[[categories]]
slug = "kwork"
base_quota = 20
display_order = 9
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.engine.log_level, "debug");
    assert_eq!(config.engine.max_in_flight, 16);
    assert_eq!(config.storage.database_path, "/tmp/leadpool-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.storage.busy_timeout_ms, 250);
    assert_eq!(config.allocation.low_water_percent, 10.0);
    assert_eq!(config.allocation.max_retries, 5);
    assert_eq!(config.normalize.trunk_prefixes.len(), 1);
    assert_eq!(config.categories.len(), 2);
    assert_eq!(config.categories[1].slug, "kwork");
    assert_eq!(config.categories[1].display_order, 9);
}

/// Unknown field in [storage] produces an error naming the key.
#[test]
fn unknown_field_in_storage_produces_error() {
    let toml = r#"
[storage]
wal_mod = true
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("wal_mod"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// Unknown section at top level is rejected.
#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[cost]
daily_budget_usd = 1.0
"#;

    assert!(load_config_from_str(toml).is_err());
}

/// Missing sections fall back to compiled defaults.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should deserialize");
    assert_eq!(config.engine.log_level, "info");
    assert_eq!(config.engine.max_in_flight, 1024);
    assert!(config.storage.wal_mode);
    assert_eq!(config.storage.busy_timeout_ms, 5000);
    assert_eq!(config.allocation.low_water_percent, 5.0);
    assert_eq!(config.allocation.max_retries, 3);
    assert_eq!(config.normalize.default_platform, "telegram");
    assert_eq!(config.categories.len(), 8);
}

/// A later layer overrides a single key without touching its siblings.
#[test]
fn layered_override_keeps_sibling_defaults() {
    let config: LeadpoolConfig = Figment::new()
        .merge(Serialized::defaults(LeadpoolConfig::default()))
        .merge(("allocation.max_retries", 7))
        .extract()
        .expect("should merge override");

    assert_eq!(config.allocation.max_retries, 7);
    assert_eq!(config.allocation.retry_backoff_ms, 50);
}

/// Overriding the storage path the way `LEADPOOL_STORAGE_DATABASE_PATH` would.
#[test]
fn storage_path_override() {
    let config: LeadpoolConfig = Figment::new()
        .merge(Serialized::defaults(LeadpoolConfig::default()))
        .merge(("storage.database_path", "/var/lib/leadpool/pool.db"))
        .extract()
        .expect("should merge override");

    assert_eq!(config.storage.database_path, "/var/lib/leadpool/pool.db");
}

/// Typo in a category key suggests the intended key.
#[test]
fn diagnostic_base_qouta_suggests_base_quota() {
    let valid_keys = &["slug", "name", "base_quota", "display_order"];
    assert_eq!(
        suggest_key("base_qouta", valid_keys),
        Some("base_quota".to_string())
    );
}

/// Error output from load_and_validate_str names the key, suggestion and valid keys.
#[test]
fn diagnostic_error_includes_unknown_key() {
    let toml = r#"
[allocation]
max_retires = 2
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let has_unknown_key = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "max_retires"
                && suggestion.as_deref() == Some("max_retries")
                && valid_keys.contains("retry_backoff_ms")
        })
    });
    assert!(
        has_unknown_key,
        "should have UnknownKey error for 'max_retires', got: {errors:?}"
    );
}

/// Wrong value type is reported, not silently defaulted.
#[test]
fn diagnostic_invalid_type_message() {
    let toml = r#"
[engine]
max_in_flight = "lots"
"#;

    let err = load_config_from_str(toml).expect_err("should reject invalid type");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("invalid type") || err_str.contains("max_in_flight"),
        "error should mention type mismatch, got: {err_str}"
    );
}

/// ConfigError renders through miette's graphical handler with its help text.
#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "wal_mod".to_string(),
        suggestion: Some("wal_mode".to_string()),
        valid_keys: "database_path, wal_mode, busy_timeout_ms".to_string(),
        entry: None,
        span: None,
        src: None,
    };

    assert!(error.code().is_some());
    let help = error.help().expect("should have help text").to_string();
    assert!(help.contains("did you mean `wal_mode`"), "got: {help}");

    let mut buf = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut buf, &error)
        .expect("should render without error");
    assert!(buf.contains("wal_mod"));
}

/// Validation runs after a successful parse.
#[test]
fn validation_catches_duplicate_slug() {
    let toml = r#"
[[categories]]
slug = "vk"
base_quota = 1

[[categories]]
slug = "vk"
base_quota = 2
"#;

    let errors = load_and_validate_str(toml).expect_err("duplicate slug should fail");
    let Some(ConfigError::Category { slug, index, span, .. }) = errors.first() else {
        panic!("expected a category error, got: {errors:?}");
    };
    assert_eq!(slug, "vk");
    assert_eq!(*index, 1);
    let span = span.expect("duplicate entry should be located");
    assert_eq!(span.offset(), toml.rfind("slug").unwrap());
}

/// Validation errors point at the key they are about.
#[test]
fn validation_error_carries_a_span() {
    let toml = "[allocation]\nlow_water_percent = 140.0\n";

    let errors = load_and_validate_str(toml).expect_err("out of range should fail");
    let Some(ConfigError::Validation { key, span, src, .. }) = errors.first() else {
        panic!("expected a validation error, got: {errors:?}");
    };
    assert_eq!(key, "allocation.low_water_percent");
    assert_eq!(span.map(|s| s.offset()), toml.find("low_water_percent"));
    assert!(src.is_some());
}

/// An unknown key inside a category names the entry by slug.
#[test]
fn unknown_key_in_category_names_the_entry() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(
        file,
        "[[categories]]\nslug = \"vk\"\nbase_quota = 3\n\n[[categories]]\nslug = \"avito\"\nbase_qouta = 3"
    )
    .expect("write config");

    let errors = load_and_validate_path(file.path()).expect_err("typo should fail");
    let unknown = errors
        .iter()
        .find(|e| matches!(e, ConfigError::UnknownKey { .. }))
        .expect("unknown key error");
    assert_eq!(
        unknown.to_string(),
        "unknown configuration key `base_qouta` in [[categories]] entry `avito`"
    );
}

/// A config file passed explicitly is loaded and validated.
#[test]
fn explicit_path_is_loaded() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(
        file,
        "[allocation]\nlow_water_percent = 12.5\n\n[[categories]]\nslug = \"avito\"\nbase_quota = 40"
    )
    .expect("write config");

    let config = load_and_validate_path(file.path()).expect("file config should validate");
    assert_eq!(config.allocation.low_water_percent, 12.5);
    assert_eq!(config.categories.len(), 1);
    assert_eq!(config.categories[0].slug, "avito");
}

/// A missing explicit path is an error rather than a silent fallback.
#[test]
fn missing_explicit_path_is_an_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let errors = load_and_validate_path(&dir.path().join("absent.toml"))
        .expect_err("missing file should fail");
    assert!(matches!(errors[0], ConfigError::Other(_)));
}
