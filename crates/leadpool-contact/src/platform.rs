// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Platforms a contact can be recognized as, and their key/URL conventions.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// A platform recognizable from the shape of a contact.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Telegram,
    Vk,
    Instagram,
    Ok,
    Avito,
    Kwork,
    /// Classifieds links kept whole (youla.ru, trk.mail.ru redirects).
    Yula,
    Phone,
}

impl Platform {
    /// Domains whose links identify this platform. Subdomains match too.
    pub fn link_domains(self) -> &'static [&'static str] {
        match self {
            Platform::Telegram => &["t.me", "telegram.me", "telegram.dog"],
            Platform::Vk => &["vk.com", "vk.ru"],
            Platform::Instagram => &["instagram.com"],
            Platform::Ok => &["ok.ru"],
            Platform::Avito => &["avito.ru"],
            Platform::Kwork => &["kwork.ru"],
            Platform::Yula => &["youla.ru", "mail.ru"],
            Platform::Phone => &[],
        }
    }

    /// Tag placed before `:` in a normalized key. Yula keys carry no tag.
    pub fn key_prefix(self) -> Option<&'static str> {
        match self {
            Platform::Telegram => Some("telegram"),
            Platform::Vk => Some("vk"),
            Platform::Instagram => Some("ig"),
            Platform::Ok => Some("ok"),
            Platform::Avito => Some("avito"),
            Platform::Kwork => Some("kwork"),
            Platform::Phone => Some("phone"),
            Platform::Yula => None,
        }
    }

    /// Category slug this platform maps to. A phone number may belong to
    /// several messenger pools, so it maps to none.
    pub fn category_slug(self) -> Option<&'static str> {
        match self {
            Platform::Telegram => Some("telegram"),
            Platform::Vk => Some("vk"),
            Platform::Instagram => Some("instagram"),
            Platform::Ok => Some("ok"),
            Platform::Avito => Some("avito"),
            Platform::Kwork => Some("kwork"),
            Platform::Yula => Some("yula"),
            Platform::Phone => None,
        }
    }

    /// Whether a link to this platform decides the category on its own.
    ///
    /// Messenger handles are shared across pools and phone numbers across
    /// messengers, so neither is authoritative.
    pub fn is_link_authoritative(self) -> bool {
        !matches!(self, Platform::Telegram | Platform::Phone)
    }

    /// Find the platform a normalized key belongs to.
    pub fn from_key(key: &str) -> Option<Platform> {
        if let Some(platform) = key
            .split_once(':')
            .and_then(|(prefix, _)| Platform::from_key_prefix(prefix))
        {
            return Some(platform);
        }
        if host_matches(host_of(key), Platform::Yula.link_domains()) {
            return Some(Platform::Yula);
        }
        None
    }

    /// Find the platform whose key prefix is `prefix` (`ig` -> Instagram).
    pub fn from_key_prefix(prefix: &str) -> Option<Platform> {
        Platform::iter().find(|p| p.key_prefix() == Some(prefix))
    }

    /// Clickable URL for the part of a normalized key after the prefix.
    pub fn profile_url(self, rest: &str) -> Option<String> {
        let rest = rest.trim();
        if rest.is_empty() {
            return None;
        }
        match self {
            Platform::Telegram => Some(format!("https://t.me/{rest}")),
            Platform::Vk => Some(format!("https://vk.com/{rest}")),
            Platform::Instagram => Some(format!("https://instagram.com/{rest}")),
            Platform::Ok => Some(format!("https://ok.ru/{rest}")),
            Platform::Avito => Some(format!("https://avito.ru/{rest}")),
            Platform::Kwork => Some(format!("https://kwork.ru/{rest}")),
            Platform::Phone if rest.chars().all(|c| c.is_ascii_digit()) => {
                Some(format!("https://wa.me/{rest}"))
            }
            Platform::Phone | Platform::Yula => None,
        }
    }
}

/// Clickable URL for a normalized key, `None` when the key has no known form.
pub fn url_for_key(key: &str) -> Option<String> {
    let (prefix, rest) = key.split_once(':')?;
    Platform::from_key_prefix(prefix)?.profile_url(rest)
}

/// Host part of a protocol-stripped link (`vk.com/id1` -> `vk.com`).
pub(crate) fn host_of(link: &str) -> &str {
    link.split(['/', '?']).next().unwrap_or_default()
}

/// True when `host` is one of `domains` or a subdomain of one.
pub(crate) fn host_matches(host: &str, domains: &[&str]) -> bool {
    domains.iter().any(|domain| {
        host == *domain
            || host
                .strip_suffix(domain)
                .is_some_and(|head| head.ends_with('.'))
    })
}
