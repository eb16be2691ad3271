// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-empty paths, percentage ranges, and unique category slugs.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::diagnostic::ConfigError;
use crate::model::LeadpoolConfig;

/// Accepted values of `engine.log_level`.
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Key prefixes a bare username may be attributed to.
const USERNAME_PLATFORMS: &[&str] = &["telegram", "vk", "ig", "ok", "avito", "kwork"];

const TRUNK_PREFIXES: &str = "normalize.trunk_prefixes";

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &LeadpoolConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.engine.log_level.as_str()) {
        errors.push(ConfigError::validation(
            "engine.log_level",
            format!(
                "engine.log_level `{}` must be one of: {}",
                config.engine.log_level,
                LOG_LEVELS.join(", ")
            ),
        ));
    }

    if config.engine.max_in_flight == 0 {
        errors.push(ConfigError::validation(
            "engine.max_in_flight",
            "engine.max_in_flight must be at least 1",
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path",
            "storage.database_path must not be empty",
        ));
    }

    let low_water = config.allocation.low_water_percent;
    if !(0.0..=100.0).contains(&low_water) {
        errors.push(ConfigError::validation(
            "allocation.low_water_percent",
            format!("allocation.low_water_percent must be within 0..=100, got {low_water}"),
        ));
    }

    if !USERNAME_PLATFORMS.contains(&config.normalize.default_platform.as_str()) {
        errors.push(ConfigError::validation(
            "normalize.default_platform",
            format!(
                "normalize.default_platform `{}` must be one of: {}",
                config.normalize.default_platform,
                USERNAME_PLATFORMS.join(", ")
            ),
        ));
    }

    for (i, rule) in config.normalize.trunk_prefixes.iter().enumerate() {
        let digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
        if !digits(&rule.from) || !digits(&rule.to) {
            errors.push(ConfigError::validation(
                TRUNK_PREFIXES,
                format!("normalize.trunk_prefixes[{i}] `from` and `to` must be non-empty digit strings"),
            ));
        }
        if rule.length <= rule.from.len() {
            errors.push(ConfigError::validation(
                TRUNK_PREFIXES,
                format!(
                    "normalize.trunk_prefixes[{i}].length must exceed the prefix length, got {}",
                    rule.length
                ),
            ));
        }
    }

    let mut seen_slugs = HashMap::new();
    for (i, category) in config.categories.iter().enumerate() {
        let slug = category.slug.trim();
        if slug.is_empty() {
            errors.push(ConfigError::category(i, &category.slug, "slug must not be empty"));
            continue;
        }
        if slug != category.slug || slug.chars().any(|c| c.is_whitespace()) {
            errors.push(ConfigError::category(
                i,
                &category.slug,
                "slug must not contain whitespace",
            ));
        }
        match seen_slugs.entry(slug.to_lowercase()) {
            Entry::Occupied(first) => errors.push(ConfigError::category(
                i,
                &category.slug,
                format!("duplicate category slug, already used by entry {}", first.get()),
            )),
            Entry::Vacant(slot) => {
                slot.insert(i);
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
