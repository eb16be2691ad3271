// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical identity keys for raw contact strings.
//!
//! `@lestily`, `t.me/lestily` and `lestily` all become `telegram:lestily`;
//! `vk.com/id1` and `VK.RU/id1/` become `vk:id1`; phone numbers in any
//! punctuation become `phone:<digits>` after trunk prefix substitution.
//! An empty key means "not a valid contact".

use std::sync::LazyLock;

use leadpool_config::model::{NormalizeConfig, TrunkPrefixConfig};
use regex::Regex;

use crate::platform::{Platform, host_matches, host_of, url_for_key};

static BARE_USERNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_]{2,}$").expect("static regex"));

/// Platforms decomposed into `<prefix>:<path>` when a link to them is seen.
const PATH_PLATFORMS: &[Platform] = &[
    Platform::Vk,
    Platform::Instagram,
    Platform::Ok,
    Platform::Avito,
    Platform::Kwork,
];

/// Replace a national trunk prefix with the country code it stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrunkRule {
    from: String,
    to: String,
    length: usize,
}

impl TrunkRule {
    /// A number of exactly `length` digits starting with `from` gets `from` replaced by `to`.
    pub fn new(from: impl Into<String>, to: impl Into<String>, length: usize) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            length,
        }
    }

    /// Leading digits the rule replaces.
    pub fn national_prefix(&self) -> &str {
        &self.from
    }

    pub fn country_code(&self) -> &str {
        &self.to
    }

    pub fn length(&self) -> usize {
        self.length
    }

    fn apply(&self, digits: &str) -> Option<String> {
        if digits.len() != self.length {
            return None;
        }
        digits
            .strip_prefix(self.from.as_str())
            .map(|rest| format!("{}{rest}", self.to))
    }
}

impl From<&TrunkPrefixConfig> for TrunkRule {
    fn from(config: &TrunkPrefixConfig) -> Self {
        TrunkRule::new(config.from.clone(), config.to.clone(), config.length)
    }
}

/// Turns raw contact text into a comparable key.
///
/// Total and deterministic: never fails, and returns an empty string for
/// blank input.
#[derive(Debug, Clone)]
pub struct ContactNormalizer {
    default_platform: String,
    trunk_rules: Vec<TrunkRule>,
}

impl Default for ContactNormalizer {
    fn default() -> Self {
        Self {
            default_platform: "telegram".to_string(),
            trunk_rules: vec![TrunkRule::new("8", "7", 11)],
        }
    }
}

impl ContactNormalizer {
    pub fn new(default_platform: impl Into<String>, trunk_rules: Vec<TrunkRule>) -> Self {
        Self {
            default_platform: default_platform.into(),
            trunk_rules,
        }
    }

    pub fn from_config(config: &NormalizeConfig) -> Self {
        Self::new(
            config.default_platform.clone(),
            config.trunk_prefixes.iter().map(TrunkRule::from).collect(),
        )
    }

    pub fn trunk_rules(&self) -> &[TrunkRule] {
        &self.trunk_rules
    }

    /// Compute the normalized key of `raw`.
    pub fn normalize(&self, raw: &str) -> String {
        let lowered = raw.trim().to_lowercase();
        if lowered.is_empty() {
            return String::new();
        }
        let c = strip_scheme(&lowered);
        let host = host_of(c);

        // Classifieds links are compared whole; their paths carry tracking noise
        // but no stable identity segment.
        if host_matches(host, Platform::Yula.link_domains()) {
            return c.to_string();
        }

        if host_matches(host, Platform::Telegram.link_domains()) {
            if let Some(key) = prefixed_path(c, "telegram") {
                return key;
            }
        }
        if let Some(handle) = c.strip_prefix('@') {
            let rest = clean_path(handle);
            if !rest.is_empty() {
                return format!("telegram:{rest}");
            }
        }

        for platform in PATH_PLATFORMS {
            if !host_matches(host, platform.link_domains()) {
                continue;
            }
            if let Some(key) = platform
                .key_prefix()
                .and_then(|prefix| prefixed_path(c, prefix))
            {
                return key;
            }
        }

        if let Some(digits) = phone_digits(c) {
            return format!("phone:{}", self.apply_trunk_rules(digits));
        }

        if BARE_USERNAME.is_match(c) {
            return format!("{}:{c}", self.default_platform);
        }

        c.to_string()
    }

    /// Clickable profile URL for `raw`, if its platform has one.
    pub fn contact_url(&self, raw: &str) -> Option<String> {
        url_for_key(&self.normalize(raw))
    }

    fn apply_trunk_rules(&self, digits: String) -> String {
        self.trunk_rules
            .iter()
            .find_map(|rule| rule.apply(&digits))
            .unwrap_or(digits)
    }
}

/// Normalize with the default rules (telegram usernames, `8 -> 7` trunk prefix).
pub fn normalize(raw: &str) -> String {
    static DEFAULT: LazyLock<ContactNormalizer> = LazyLock::new(ContactNormalizer::default);
    DEFAULT.normalize(raw)
}

/// Clickable profile URL for `raw` under the default rules.
pub fn contact_url(raw: &str) -> Option<String> {
    url_for_key(&normalize(raw))
}

fn strip_scheme(s: &str) -> &str {
    let s = s
        .strip_prefix("https://")
        .or_else(|| s.strip_prefix("http://"))
        .unwrap_or(s);
    s.strip_prefix("www.").unwrap_or(s).trim()
}

/// `vk.com/id1/?x=1` with prefix `vk` -> `vk:id1`. `None` when the path is empty.
fn prefixed_path(link: &str, prefix: &str) -> Option<String> {
    let (_, path) = link.split_once('/')?;
    let rest = clean_path(path);
    (!rest.is_empty()).then(|| format!("{prefix}:{rest}"))
}

fn clean_path(path: &str) -> &str {
    path.split('?')
        .next()
        .unwrap_or_default()
        .trim()
        .trim_end_matches('/')
}

/// Digits of `s` if it is made only of digits and phone punctuation.
fn phone_digits(s: &str) -> Option<String> {
    let digits: String = s
        .chars()
        .filter(|c| !(c.is_whitespace() || matches!(c, '-' | '(' | ')' | '+')))
        .collect();
    (!digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())).then_some(digits)
}
