// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cleaning of bulk-imported contact values.

use std::collections::HashSet;

use leadpool_contact::ContactNormalizer;
use leadpool_core::NewContact;

/// Column headers that show up as the first row of exported sheets.
const HEADER_WORDS: &[&str] = &["value", "значение", "контакт", "данные"];

/// Trim, drop spreadsheet formula prefixes and header rows, and drop
/// repeats within the batch (case-insensitive). Order is preserved.
pub fn clean_values<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter_map(|value| {
            let value = value.as_ref().trim();
            let value = value.strip_prefix('=').unwrap_or(value).trim();
            if value.is_empty() {
                return None;
            }
            let folded = value.to_lowercase();
            if HEADER_WORDS.contains(&folded.as_str()) || !seen.insert(folded) {
                return None;
            }
            Some(value.to_string())
        })
        .collect()
}

/// Pair every cleaned value with its normalized key.
pub fn prepare_contacts<I, S>(values: I, normalizer: &ContactNormalizer) -> Vec<NewContact>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    clean_values(values)
        .into_iter()
        .map(|value| NewContact {
            normalized_key: normalizer.normalize(&value),
            value,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_artifacts_and_headers() {
        let cleaned = clean_values([
            "Значение",
            "  =@anna ",
            "",
            "+7 912 345 67 89",
            "@ANNA",
            "value",
            "   ",
        ]);
        assert_eq!(cleaned, ["@anna", "+7 912 345 67 89"]);
    }

    #[test]
    fn keys_are_computed() {
        let contacts = prepare_contacts(["t.me/lena_k"], &ContactNormalizer::default());
        assert_eq!(contacts[0].value, "t.me/lena_k");
        assert_eq!(contacts[0].normalized_key, "telegram:lena_k");
    }
}
