// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `normalize`, `extract`, and `classify` commands.

use leadpool_config::LeadpoolConfig;
use leadpool_contact::{ContactExtractor, ContactNormalizer};
use leadpool_core::{LeadpoolError, WorkerId};
use leadpool_engine::LeadEngine;
use serde::Serialize;

use crate::output::Output;

#[derive(Debug, Serialize)]
pub struct NormalizeResponse {
    pub raw: String,
    pub key: String,
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExtractedContact {
    pub raw: String,
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    pub raw: String,
    pub key: String,
    pub category: Option<String>,
}

pub fn run_normalize(config: &LeadpoolConfig, raw: &str, out: &Output) -> Result<(), LeadpoolError> {
    let normalizer = ContactNormalizer::from_config(&config.normalize);
    let key = normalizer.normalize(raw);
    if key.is_empty() {
        return Err(LeadpoolError::InvalidContact(raw.to_string()));
    }
    let response = NormalizeResponse {
        raw: raw.to_string(),
        url: normalizer.contact_url(raw),
        key,
    };
    out.emit(&response, |_| {
        println!("{}", response.key);
        if let Some(url) = &response.url {
            println!("{url}");
        }
    });
    Ok(())
}

pub fn run_extract(config: &LeadpoolConfig, text: &str, out: &Output) -> Result<(), LeadpoolError> {
    let extractor = ContactExtractor::new(ContactNormalizer::from_config(&config.normalize));
    let found: Vec<ExtractedContact> = extractor
        .extract(text)
        .into_iter()
        .map(|raw| ExtractedContact {
            key: extractor.normalizer().normalize(&raw),
            raw,
        })
        .collect();
    out.emit(&found, |paint| {
        if found.is_empty() {
            println!("{}", paint.warn("no contacts found"));
        }
        for contact in &found {
            println!("{}\t{}", contact.raw, contact.key);
        }
    });
    Ok(())
}

pub async fn run_classify(
    engine: &LeadEngine,
    worker: &str,
    raw: &str,
    context: Option<&str>,
    out: &Output,
) -> Result<(), LeadpoolError> {
    let key = engine.normalize(raw);
    if key.is_empty() {
        return Err(LeadpoolError::InvalidContact(raw.to_string()));
    }
    let worker = WorkerId::from(worker);
    let category = match context {
        Some(context) => engine.classify_with_hints(raw, &worker, context).await,
        None => engine.classify(raw, &worker).await,
    };
    let response = ClassifyResponse {
        raw: raw.to_string(),
        key,
        category,
    };
    out.emit(&response, |paint| match &response.category {
        Some(category) => println!("{}", paint.good(category)),
        None => println!("{}", paint.warn("no category")),
    });
    Ok(())
}
