// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Leadpool engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Leadpool configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LeadpoolConfig {
    /// Engine runtime settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Allocation retry and pool alert settings.
    #[serde(default)]
    pub allocation: AllocationConfig,

    /// Contact normalization rules.
    #[serde(default)]
    pub normalize: NormalizeConfig,

    /// Contact pool categories, synced into storage at startup.
    #[serde(default = "default_categories")]
    pub categories: Vec<CategoryConfig>,
}

impl Default for LeadpoolConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            storage: StorageConfig::default(),
            allocation: AllocationConfig::default(),
            normalize: NormalizeConfig::default(),
            categories: default_categories(),
        }
    }
}

/// Engine runtime configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Logging level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Upper bound of concurrently processed (worker, category) allocations.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            max_in_flight: default_max_in_flight(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_in_flight() -> usize {
    1024
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

    /// How long a statement waits for a lock before failing with contention.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("leadpool").join("leadpool.db"))
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "leadpool.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// Allocation behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AllocationConfig {
    /// Warn when the free share of a category drops below this percentage.
    #[serde(default = "default_low_water_percent")]
    pub low_water_percent: f64,

    /// Transparent retries of an allocation or claim on storage contention.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff between retries, doubled after each attempt.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            low_water_percent: default_low_water_percent(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

fn default_low_water_percent() -> f64 {
    5.0
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    50
}

/// Contact normalization configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NormalizeConfig {
    /// Platform tag given to bare usernames (`lestily` -> `telegram:lestily`).
    #[serde(default = "default_platform")]
    pub default_platform: String,

    /// National trunk prefix substitutions applied to phone numbers.
    #[serde(default = "default_trunk_prefixes")]
    pub trunk_prefixes: Vec<TrunkPrefixConfig>,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            default_platform: default_platform(),
            trunk_prefixes: default_trunk_prefixes(),
        }
    }
}

fn default_platform() -> String {
    "telegram".to_string()
}

fn default_trunk_prefixes() -> Vec<TrunkPrefixConfig> {
    vec![TrunkPrefixConfig {
        from: "8".to_string(),
        to: "7".to_string(),
        length: 11,
    }]
}

/// One trunk prefix rule: a number of exactly `length` digits starting with
/// `from` gets that prefix replaced by `to`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TrunkPrefixConfig {
    pub from: String,
    pub to: String,
    pub length: usize,
}

/// A contact pool category.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryConfig {
    /// Stable system name.
    pub slug: String,

    /// Display name. Defaults to the slug.
    #[serde(default)]
    pub name: Option<String>,

    /// Contacts a worker may take before a manager grants more.
    #[serde(default)]
    pub base_quota: u32,

    /// Position in listings.
    #[serde(default)]
    pub display_order: u32,
}

fn default_categories() -> Vec<CategoryConfig> {
    [
        ("telegram", "Telegram", 50),
        ("whatsapp", "WhatsApp", 35),
        ("max", "Max", 35),
        ("viber", "Viber", 35),
        ("instagram", "Instagram", 300),
        ("vk", "VK", 250),
        ("ok", "Odnoklassniki", 250),
        ("email", "Email", 100),
    ]
    .into_iter()
    .enumerate()
    .map(|(order, (slug, name, quota))| CategoryConfig {
        slug: slug.to_string(),
        name: Some(name.to_string()),
        base_quota: quota,
        display_order: order as u32,
    })
    .collect()
}
