// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Best-effort category guesses from the words around a contact.
//!
//! Used only after structural classification found nothing. The keyword
//! lists are heuristics and can misfire on unrelated text.

use std::sync::LazyLock;

use regex::Regex;

/// Suggests a category from message context.
pub trait CategoryHintPolicy: Send + Sync {
    /// Category slug suggested by `context`, if any.
    fn suggest(&self, context: &str) -> Option<String>;
}

static DEFAULT_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?i)\b(?:тг|телеграм|телега|tg|telegram)\b", "telegram"),
        (r"(?i)\b(?:вк|вконтакте|vk)\b", "vk"),
        (r"(?i)\b(?:инст|инста|инсты|инсте|инстаграм|insta|instagram)\b", "instagram"),
        (r"(?i)\b(?:однокл|одноклассники)\b", "ok"),
        (r"(?i)\b(?:ватсап|вотсап|whatsapp)\b", "whatsapp"),
        (r"(?i)\b(?:вайбер|viber)\b", "viber"),
        (r"(?i)\bавито\b", "avito"),
        (r"(?i)\bюла\b", "yula"),
        (r"(?i)\bкворк\b", "kwork"),
        (r"(?i)\b(?:сам|сама|самостоятельно)\b", "self"),
    ]
    .into_iter()
    .map(|(re, slug)| (Regex::new(re).expect("static regex"), slug))
    .collect()
});

/// Ordered keyword rules with an optional catch-all bucket.
#[derive(Debug, Clone)]
pub struct KeywordHints {
    rules: Vec<(Regex, String)>,
    fallback: Option<String>,
}

impl Default for KeywordHints {
    /// Platform words first, self-sourced words last, anything else lands in `self`.
    fn default() -> Self {
        Self {
            rules: DEFAULT_RULES
                .iter()
                .map(|(re, slug)| (re.clone(), slug.to_string()))
                .collect(),
            fallback: Some("self".to_string()),
        }
    }
}

impl KeywordHints {
    pub fn new(rules: Vec<(Regex, String)>, fallback: Option<String>) -> Self {
        Self { rules, fallback }
    }

    /// Same rules, different catch-all (`None` disables it).
    pub fn with_fallback(mut self, fallback: Option<String>) -> Self {
        self.fallback = fallback;
        self
    }
}

impl CategoryHintPolicy for KeywordHints {
    fn suggest(&self, context: &str) -> Option<String> {
        self.rules
            .iter()
            .find(|(re, _)| re.is_match(context))
            .map(|(_, slug)| slug.clone())
            .or_else(|| self.fallback.clone())
    }
}
