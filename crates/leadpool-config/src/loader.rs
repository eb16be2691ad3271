// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./leadpool.toml` > `~/.config/leadpool/leadpool.toml` > `/etc/leadpool/leadpool.toml`
//! with environment variable overrides via `LEADPOOL_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::LeadpoolConfig;

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/leadpool/leadpool.toml";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "leadpool.toml";

/// Sections addressable through `LEADPOOL_<SECTION>_<KEY>` variables.
const ENV_SECTIONS: &[&str] = &["engine", "storage", "allocation", "normalize"];

/// User config file under the XDG config directory, if one can be determined.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("leadpool").join(LOCAL_CONFIG_FILE))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/leadpool/leadpool.toml`
/// 3. `~/.config/leadpool/leadpool.toml`
/// 4. `./leadpool.toml`
/// 5. `LEADPOOL_*` environment variables
pub fn load_config() -> Result<LeadpoolConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<LeadpoolConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LeadpoolConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<LeadpoolConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LeadpoolConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the layered Figment before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(LeadpoolConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Environment provider mapping `section_key` to `section.key`.
///
/// Only the first underscore after a known section name is turned into a dot,
/// so `LEADPOOL_STORAGE_BUSY_TIMEOUT_MS` lands on `storage.busy_timeout_ms`.
fn env_provider() -> Env {
    Env::prefixed("LEADPOOL_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
