// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Candidate contacts in free-form message text.
//!
//! A single eager pass collects mentions, messenger links, social profile
//! links, marketplace and freelance links, and phone numbers, then collapses
//! candidates that share a normalized key.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::normalize::{ContactNormalizer, TrunkRule};
use crate::platform::Platform;

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("static regex")
}

// The leading group stands in for a lookbehind: `ivan@mail.ru` is an email, not a mention.
// The handle is captured whole so over-long handles can be refused, not truncated.
static MENTION: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?:^|[^a-zA-Z0-9_.@])@([a-zA-Z0-9_]+)"));
const MENTION_LEN: std::ops::RangeInclusive<usize> = 4..=32;
static TELEGRAM_LINK: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?i)(?:https?://)?\b(?:t\.me|telegram\.me|telegram\.dog)/([a-zA-Z0-9_]+)")
});
static VK_LINK: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?i)(?:https?://)?(?:www\.|m\.)?\bvk\.(com|ru)/([a-zA-Z0-9_.\-]+)")
});
static AVITO_LINK: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?i)(?:https?://)?(?:www\.|m\.)?\bavito\.ru/([a-zA-Z0-9_/\-]+)")
});
static INSTAGRAM_LINK: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?i)(?:https?://)?(?:[a-zA-Z0-9\-]+\.)?\binstagram\.com/([a-zA-Z0-9_.\-]+)")
});
static YULA_LINK: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?i)https?://(?:trk\.mail\.ru/\S+|(?:[a-zA-Z0-9\-]+\.)?youla\.ru/\S+)")
});
static OK_PROFILE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?i)(?:https?://)?(?:www\.|m\.)?\bok\.ru/profile/([0-9]+)")
});
static OK_LINK: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?i)(?:https?://)?(?:www\.|m\.)?\bok\.ru/([a-zA-Z0-9_.\-]+)")
});
static KWORK_LINK: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?i)(?:https?://)?(?:www\.)?\bkwork\.ru/([a-zA-Z0-9_/\-]+)")
});
static VK_NUMERIC_ID: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)^id([0-9]+)$"));
/// Phone shape for the default `8 -> 7` trunk rule.
static PHONE: LazyLock<Regex> = LazyLock::new(|| phone_pattern(&[TrunkRule::new("8", "7", 11)]));
/// Numbers written with an explicit `+` when no trunk rule applies.
const INTERNATIONAL_PHONE: &str = r"\+[0-9](?:[\s\-()]*[0-9]){9,13}";
static LATIN_LOGIN: LazyLock<Regex> = LazyLock::new(|| pattern(r"^[a-zA-Z0-9_]{4,32}$"));

/// Mentioning the freelance platform in a message.
static KWORK_KEYWORD: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)\bкворк\b"));

/// Variants carrying one of these win ties over bare handles.
const PLATFORM_PREFIXES: &[&str] = &[
    "instagram.com/",
    "vk.com/",
    "vk.ru/",
    "t.me/",
    "avito.ru/",
    "kwork.ru/",
    "ok.ru/",
];

/// Words that look like logins but are link debris.
const LOGIN_STOPWORDS: &[&str] = &["https", "http", "kwork"];
const LOGIN_DEBRIS: &[&str] = &["http", "www", "tme", "vkru", "avitoru"];

/// One level of first-token fallback.
const MAX_FALLBACK_DEPTH: usize = 1;

/// Phone numbers shaped by the trunk rules: either the national or the
/// international prefix, followed by the remaining digits of the rule's length
/// with optional spaces, dashes, and parentheses between them.
pub fn phone_pattern(rules: &[TrunkRule]) -> Regex {
    let shapes: Vec<String> = rules
        .iter()
        .filter(|rule| rule.length() > rule.national_prefix().len())
        .map(|rule| {
            format!(
                r"(?:{}|{})(?:[\s\-()]*[0-9]){{{}}}",
                regex::escape(rule.national_prefix()),
                regex::escape(rule.country_code()),
                rule.length() - rule.national_prefix().len()
            )
        })
        .collect();
    let source = if shapes.is_empty() {
        INTERNATIONAL_PHONE.to_string()
    } else {
        format!(r"\+?(?:{})", shapes.join("|"))
    };
    Regex::new(&source).unwrap_or_else(|_| pattern(INTERNATIONAL_PHONE))
}

/// Finds contact candidates in text. Never fails; an empty list means nothing was found.
#[derive(Debug, Clone)]
pub struct ContactExtractor {
    normalizer: ContactNormalizer,
    phone: Regex,
}

impl Default for ContactExtractor {
    fn default() -> Self {
        Self {
            normalizer: ContactNormalizer::default(),
            phone: PHONE.clone(),
        }
    }
}

impl ContactExtractor {
    /// Phone numbers are recognized by the normalizer's trunk rules.
    pub fn new(normalizer: ContactNormalizer) -> Self {
        let phone = phone_pattern(normalizer.trunk_rules());
        Self { normalizer, phone }
    }

    pub fn normalizer(&self) -> &ContactNormalizer {
        &self.normalizer
    }

    /// Raw candidates in order of first appearance, one per normalized key.
    pub fn extract(&self, text: &str) -> Vec<String> {
        self.extract_at_depth(text, 0)
    }

    fn extract_at_depth(&self, text: &str, depth: usize) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let mut found = scan(text, &self.phone);
        if found.is_empty() {
            found = self.fallback(text, depth);
        }
        self.dedup(found)
    }

    /// `"@LinaSmirnov тг"` style submissions: retry on the first token alone,
    /// and accept that token when it normalizes to a platform handle.
    ///
    /// Best effort: any latin first word passes as a handle, so `"hello there"`
    /// yields `hello`.
    fn fallback(&self, text: &str, depth: usize) -> Vec<String> {
        let Some(first) = text.split_whitespace().next() else {
            return Vec::new();
        };
        if depth < MAX_FALLBACK_DEPTH && first != text.trim() {
            let nested = self.extract_at_depth(first, depth + 1);
            if !nested.is_empty() {
                return nested;
            }
        }
        let key = self.normalizer.normalize(first);
        match Platform::from_key(&key) {
            Some(Platform::Phone) | None => Vec::new(),
            Some(_) => vec![first.to_string()],
        }
    }

    fn dedup(&self, candidates: Vec<String>) -> Vec<String> {
        let mut slots: HashMap<String, usize> = HashMap::new();
        let mut kept: Vec<String> = Vec::new();
        for candidate in candidates {
            let key = self.normalizer.normalize(&candidate);
            if key.is_empty() {
                continue;
            }
            match slots.get(&key) {
                None => {
                    slots.insert(key, kept.len());
                    kept.push(candidate);
                }
                Some(&slot) => {
                    if has_platform_prefix(&candidate) && !has_platform_prefix(&kept[slot]) {
                        kept[slot] = candidate;
                    }
                }
            }
        }
        kept
    }
}

/// Extract with the default normalization rules.
pub fn extract(text: &str) -> Vec<String> {
    static DEFAULT: LazyLock<ContactExtractor> = LazyLock::new(ContactExtractor::default);
    DEFAULT.extract(text)
}

fn has_platform_prefix(candidate: &str) -> bool {
    let lower = candidate.to_lowercase();
    PLATFORM_PREFIXES.iter().any(|p| lower.starts_with(p))
}

/// Strip the query string and surrounding slashes or sentence dots from a path capture.
fn clean_capture(path: &str) -> &str {
    path.split('?')
        .next()
        .unwrap_or_default()
        .trim()
        .trim_matches('/')
        .trim_end_matches('.')
}

/// Whether the match is a whole number, not a slice of a longer digit run.
fn stands_alone(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(|c| c.is_ascii_digit()) && !after.is_some_and(|c| c.is_ascii_digit())
}

fn scan(text: &str, phone: &Regex) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    // Numeric profile ids (ok.ru/profile/<id>, vk.com/id<id>).
    let mut numeric_ids: Vec<String> = Vec::new();

    for cap in MENTION.captures_iter(text) {
        if MENTION_LEN.contains(&cap[1].len()) {
            out.push(format!("@{}", &cap[1]));
        }
    }
    for cap in TELEGRAM_LINK.captures_iter(text) {
        out.push(format!("t.me/{}", &cap[1]));
    }
    for cap in VK_LINK.captures_iter(text) {
        let id = clean_capture(&cap[2]);
        if let Some(digits) = VK_NUMERIC_ID.captures(id) {
            numeric_ids.push(digits[1].to_string());
        }
        if !id.is_empty() {
            out.push(format!("vk.{}/{id}", cap[1].to_lowercase()));
        }
    }
    for cap in AVITO_LINK.captures_iter(text) {
        let path = clean_capture(&cap[1]);
        if !path.is_empty() {
            out.push(format!("avito.ru/{path}"));
        }
    }
    for cap in INSTAGRAM_LINK.captures_iter(text) {
        let user = clean_capture(&cap[1]);
        if !user.is_empty() {
            out.push(format!("instagram.com/{user}"));
        }
    }
    for m in YULA_LINK.find_iter(text) {
        let url = m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']);
        if !url.is_empty() {
            out.push(url.to_string());
        }
    }
    for cap in OK_PROFILE.captures_iter(text) {
        numeric_ids.push(cap[1].to_string());
        out.push(format!("ok.ru/profile/{}", &cap[1]));
    }
    for cap in OK_LINK.captures_iter(text) {
        let user = clean_capture(&cap[1]);
        if user.is_empty() || user.eq_ignore_ascii_case("profile") {
            continue;
        }
        let link = format!("ok.ru/{user}");
        if !out.contains(&link) {
            out.push(link);
        }
    }

    // Numeric profile ids already captured must not resurface as phones.
    for m in phone.find_iter(text) {
        if !stands_alone(text, m.start(), m.end()) {
            continue;
        }
        let digits: String = m.as_str().chars().filter(char::is_ascii_digit).collect();
        let overlaps = numeric_ids
            .iter()
            .any(|id| id.contains(&digits) || digits.contains(id.as_str()));
        if !overlaps {
            out.push(m.as_str().to_string());
        }
    }

    for cap in KWORK_LINK.captures_iter(text) {
        let path = clean_capture(&cap[1]);
        if !path.is_empty() {
            out.push(format!("kwork.ru/{path}"));
        }
    }

    if KWORK_KEYWORD.is_match(text) {
        for word in text.split_whitespace() {
            let login: String = word
                .chars()
                .filter(|c| c.is_alphanumeric() || *c == '_')
                .collect();
            if !LATIN_LOGIN.is_match(&login) {
                continue;
            }
            let lower = login.to_lowercase();
            if LOGIN_STOPWORDS.contains(&lower.as_str())
                || LOGIN_DEBRIS.iter().any(|d| lower.contains(d))
            {
                continue;
            }
            out.push(login);
        }
    }

    out
}
