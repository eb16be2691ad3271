// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Config errors as miette diagnostics pointing into `leadpool.toml`.
//!
//! Parse errors come from Figment; semantic errors come from
//! [`validate_config`](crate::validation::validate_config) and get their
//! spans afterwards via [`attach_sources`]. Problems inside a
//! `[[categories]]` entry are reported against that entry's slug.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler similarity score to suggest a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

const CATEGORIES: &str = "categories";

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`{}", in_category(.entry.as_deref()))]
    #[diagnostic(
        code(leadpool::config::unknown_key),
        help("{}", format_unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        valid_keys: String,
        /// Slug of the `[[categories]]` entry holding the key, if any.
        entry: Option<String>,
        #[label("this key is not recognized")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(leadpool::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(leadpool::config::missing_key),
        help("add `{key} = <value>` to your leadpool.toml")
    )]
    MissingKey { key: String },

    /// A value that parsed but makes no sense, e.g. `low_water_percent = 120`.
    #[error("validation error: {message}")]
    #[diagnostic(code(leadpool::config::validation))]
    Validation {
        message: String,
        /// Dotted path of the offending key, e.g. `storage.database_path`.
        key: String,
        #[label("invalid value")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A `[[categories]]` entry whose slug is empty, malformed or taken.
    #[error("[[categories]] entry `{slug}`: {message}")]
    #[diagnostic(
        code(leadpool::config::category),
        help("every category needs a unique slug without whitespace")
    )]
    Category {
        slug: String,
        /// Position in the `[[categories]]` array.
        index: usize,
        message: String,
        #[label("defined here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("configuration error: {0}")]
    #[diagnostic(code(leadpool::config::other))]
    Other(String),
}

impl ConfigError {
    pub fn validation(key: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            key: key.to_string(),
            span: None,
            src: None,
        }
    }

    pub fn category(index: usize, slug: &str, message: impl Into<String>) -> Self {
        Self::Category {
            slug: slug.to_string(),
            index,
            message: message.into(),
            span: None,
            src: None,
        }
    }
}

fn in_category(entry: Option<&str>) -> String {
    entry
        .map(|slug| format!(" in [[categories]] entry `{slug}`"))
        .unwrap_or_default()
}

fn format_unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// Convert a `figment::Error` (possibly several) into diagnostics.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| match &error.kind {
            Kind::UnknownField(field, expected) => {
                let valid_keys: Vec<&str> = expected.to_vec();
                let section: Vec<String> = error.path.iter().map(|s| s.to_string()).collect();
                let located = source_of(&error, toml_sources).and_then(|(path, content)| {
                    let offset = find_key_offset(content, &section, field)?;
                    Some((path, content, offset))
                });
                let entry = located.and_then(|(_, content, offset)| {
                    (section.first().map(String::as_str) == Some(CATEGORIES))
                        .then(|| entry_slug_at(content, offset))
                        .flatten()
                });
                let (span, src) = located
                    .map(|(path, content, offset)| {
                        (
                            Some(SourceSpan::new(offset.into(), field.len())),
                            Some(NamedSource::new(path, content.to_string())),
                        )
                    })
                    .unwrap_or((None, None));

                ConfigError::UnknownKey {
                    key: field.clone(),
                    suggestion: suggest_key(field, &valid_keys),
                    valid_keys: valid_keys.join(", "),
                    entry,
                    span,
                    src,
                }
            }
            Kind::MissingField(field) => ConfigError::MissingKey {
                key: field.clone().into_owned(),
            },
            Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
                key: error.path.join("."),
                detail: format!("found {actual}, expected {expected}"),
                expected: expected.to_string(),
            },
            _ => ConfigError::Other(error.to_string()),
        })
        .collect()
}

/// Give validation errors a span into whichever source defines their key.
pub fn attach_sources(errors: Vec<ConfigError>, sources: &[(String, String)]) -> Vec<ConfigError> {
    errors
        .into_iter()
        .map(|error| match error {
            ConfigError::Validation { message, key, .. } => {
                let (section, field) = match key.rsplit_once('.') {
                    Some((section, field)) => (vec![section.to_string()], field),
                    None => (Vec::new(), key.as_str()),
                };
                let located = sources.iter().find_map(|(path, content)| {
                    let offset = find_key_offset(content, &section, field)?;
                    Some((SourceSpan::new(offset.into(), field.len()), named(path, content)))
                });
                let (span, src) = located.unzip();
                ConfigError::Validation {
                    message,
                    key,
                    span,
                    src,
                }
            }
            ConfigError::Category {
                slug,
                index,
                message,
                ..
            } => {
                let located = sources.iter().find_map(|(path, content)| {
                    let (offset, len) = find_category_slug(content, index, &slug)?;
                    Some((SourceSpan::new(offset.into(), len), named(path, content)))
                });
                let (span, src) = located.unzip();
                ConfigError::Category {
                    slug,
                    index,
                    message,
                    span,
                    src,
                }
            }
            other => other,
        })
        .collect()
}

fn named(path: &str, content: &str) -> NamedSource<String> {
    NamedSource::new(path, content.to_string())
}

/// The source file a Figment error came from, if it is one of ours.
fn source_of<'a>(
    error: &figment::error::Error,
    toml_sources: &'a [(String, String)],
) -> Option<(&'a str, &'a str)> {
    let path = match error.metadata.as_ref()?.source.as_ref()? {
        figment::Source::File(path) => path.display().to_string(),
        _ => return None,
    };
    toml_sources
        .iter()
        .find(|(p, _)| *p == path)
        .map(|(p, content)| (p.as_str(), content.as_str()))
}

/// Byte offset of `field` inside the `path[0]` section of TOML `content`.
///
/// Table arrays such as `[[categories]]` are searched entry by entry; an
/// empty `path` means top-level keys before the first header.
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let wanted = path.first().map(String::as_str);
    let mut section = None;
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if let Some(header) = section_header(trimmed) {
            section = Some(header);
        } else if section == wanted && assigns(trimmed, field) {
            return Some(offset + line.len() - trimmed.len());
        }
        offset += line.len();
    }
    None
}

fn section_header(line: &str) -> Option<&str> {
    let line = line.trim_end();
    let inner = line
        .strip_prefix("[[")
        .and_then(|l| l.strip_suffix("]]"))
        .or_else(|| line.strip_prefix('[').and_then(|l| l.strip_suffix(']')))?;
    Some(inner.trim())
}

fn assigns(line: &str, field: &str) -> bool {
    line.strip_prefix(field)
        .is_some_and(|after| after.starts_with([' ', '\t', '=']))
}

/// One `[[categories]]` block: where it starts and its `slug = "..."` line.
struct CategoryEntry {
    start: usize,
    /// Offset and length of the `slug = "..."` assignment, plus the value.
    slug: Option<(usize, usize, String)>,
}

fn category_entries(content: &str) -> Vec<CategoryEntry> {
    let mut entries: Vec<CategoryEntry> = Vec::new();
    let mut inside = false;
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let at = offset + line.len() - trimmed.len();
        offset += line.len();
        if let Some(header) = section_header(trimmed) {
            inside = header == CATEGORIES && trimmed.starts_with("[[");
            if inside {
                entries.push(CategoryEntry { start: at, slug: None });
            }
            continue;
        }
        let Some(entry) = entries.last_mut().filter(|_| inside) else {
            continue;
        };
        if entry.slug.is_none() && assigns(trimmed, "slug") {
            if let Some((value, len)) = quoted_value(&trimmed["slug".len()..]) {
                entry.slug = Some((at, "slug".len() + len, value));
            }
        }
    }
    entries
}

/// Parse ` = "value"`, returning the value and the consumed length.
fn quoted_value(rest: &str) -> Option<(String, usize)> {
    let after_eq = rest.trim_start().strip_prefix('=')?;
    let after_ws = after_eq.trim_start();
    let body = after_ws.strip_prefix('"')?;
    let close = body.find('"')?;
    let consumed = rest.len() - after_ws.len() + close + 2;
    Some((body[..close].to_string(), consumed))
}

/// Span of the `slug = "..."` line of entry `index`, or of the first entry
/// carrying `slug` when the file was merged from several layers.
fn find_category_slug(content: &str, index: usize, slug: &str) -> Option<(usize, usize)> {
    let entries = category_entries(content);
    let matches = |entry: &CategoryEntry| {
        entry
            .slug
            .as_ref()
            .filter(|(_, _, value)| value == slug)
            .map(|(offset, len, _)| (*offset, *len))
    };
    entries
        .get(index)
        .and_then(matches)
        .or_else(|| entries.iter().find_map(matches))
}

/// Slug of the `[[categories]]` entry that contains byte `offset`.
fn entry_slug_at(content: &str, offset: usize) -> Option<String> {
    category_entries(content)
        .into_iter()
        .rev()
        .find(|entry| entry.start <= offset)
        .and_then(|entry| entry.slug.map(|(_, _, value)| value))
}

/// Best Jaro-Winkler match above the suggestion threshold.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    let mut best_score = SUGGESTION_THRESHOLD;
    let mut best_match = None;

    for &key in valid_keys {
        let score = strsim::jaro_winkler(unknown, key);
        if score > best_score {
            best_score = score;
            best_match = Some(key.to_string());
        }
    }

    best_match
}

/// Render a list of `ConfigError`s to stderr using miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        let diagnostic: &dyn Diagnostic = error;
        if handler.render_report(&mut buf, diagnostic).is_ok() {
            eprint!("{buf}");
        } else {
            eprintln!("Error: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_CATEGORIES: &str = "[engine]\nlog_level = \"info\"\n\n[[categories]]\nslug = \"vk\"\nbase_quota = 3\n\n[[categories]]\nslug = \"avito\"\nbase_qouta = 3\n";

    fn sources() -> Vec<(String, String)> {
        vec![("leadpool.toml".to_string(), TWO_CATEGORIES.to_string())]
    }

    fn spanned(error: &ConfigError) -> &str {
        let span = match error {
            ConfigError::Validation { span, .. } | ConfigError::Category { span, .. } => span,
            _ => &None,
        };
        let span = span.expect("span attached");
        &TWO_CATEGORIES[span.offset()..span.offset() + span.len()]
    }

    #[test]
    fn suggest_quota_typo() {
        let valid = &["slug", "name", "base_quota", "display_order"];
        assert_eq!(
            suggest_key("base_qouta", valid),
            Some("base_quota".to_string())
        );
    }

    #[test]
    fn no_suggestion_for_distant_typo() {
        let valid = &["log_level", "max_in_flight"];
        assert_eq!(suggest_key("zzzzzz", valid), None);
    }

    #[test]
    fn key_is_found_only_inside_its_section() {
        let content = "[engine]\nwal_mod = 1\n\n[storage]\nwal_mod = true\n";
        let path = vec!["storage".to_string()];
        let o = find_key_offset(content, &path, "wal_mod").unwrap();
        assert_eq!(o, content.rfind("wal_mod").unwrap());
        assert_eq!(find_key_offset(content, &["allocation".to_string()], "wal_mod"), None);
    }

    #[test]
    fn key_in_later_table_array_entry_is_found() {
        let path = vec![CATEGORIES.to_string()];
        let o = find_key_offset(TWO_CATEGORIES, &path, "base_qouta").unwrap();
        assert_eq!(&TWO_CATEGORIES[o..o + 10], "base_qouta");
        assert_eq!(entry_slug_at(TWO_CATEGORIES, o).as_deref(), Some("avito"));
    }

    #[test]
    fn category_error_points_at_its_slug_line() {
        let errors = attach_sources(
            vec![ConfigError::category(1, "avito", "duplicate category slug")],
            &sources(),
        );
        assert_eq!(spanned(&errors[0]), "slug = \"avito\"");
        assert!(errors[0].to_string().starts_with("[[categories]] entry `avito`"));
    }

    #[test]
    fn merged_layers_fall_back_to_matching_slug() {
        let errors = attach_sources(vec![ConfigError::category(7, "vk", "bad")], &sources());
        assert_eq!(spanned(&errors[0]), "slug = \"vk\"");
    }

    #[test]
    fn validation_error_points_at_its_key() {
        let errors = attach_sources(
            vec![ConfigError::validation("engine.log_level", "bad level")],
            &sources(),
        );
        assert_eq!(spanned(&errors[0]), "log_level");
    }

    #[test]
    fn unlocatable_errors_keep_no_span() {
        let errors = attach_sources(
            vec![ConfigError::validation("storage.database_path", "empty")],
            &sources(),
        );
        assert!(matches!(&errors[0], ConfigError::Validation { span: None, src: None, .. }));
    }
}
