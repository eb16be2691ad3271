// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Category classification of a raw contact.
//!
//! Order of evidence, first match wins:
//! 1. an authoritative platform link (vk, instagram, ok, avito, kwork, yula)
//!    whose category is configured;
//! 2. a contact with the same key issued to this worker;
//! 3. a contact with the same key anywhere in the pool.
//!
//! Classification never fails. Storage errors are logged and read as "no
//! match"; `None` is an ordinary answer.

use std::sync::Arc;

use leadpool_contact::{CategoryHintPolicy, ContactNormalizer, Platform};
use leadpool_core::{ContactStore, WorkerId};
use tracing::{debug, warn};

pub struct Classifier {
    store: Arc<dyn ContactStore>,
    normalizer: ContactNormalizer,
}

impl Classifier {
    pub fn new(store: Arc<dyn ContactStore>, normalizer: ContactNormalizer) -> Self {
        Self { store, normalizer }
    }

    /// Category for `raw`, or `None` when nothing structural points to one.
    pub async fn classify(&self, raw: &str, worker: &WorkerId) -> Option<String> {
        let key = self.normalizer.normalize(raw);
        if key.is_empty() {
            return None;
        }

        if let Some(slug) = self.link_category(&key).await {
            debug!(%key, category = %slug, "classified by link");
            return Some(slug);
        }

        for scope in [Some(worker), None] {
            match self.store.find_category_by_key(&key, scope).await {
                Ok(Some(slug)) => {
                    debug!(%key, category = %slug, own = scope.is_some(), "classified by pool");
                    return Some(slug);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(%key, error = %e, "pool lookup failed during classification");
                    return None;
                }
            }
        }
        None
    }

    /// [`classify`](Self::classify), then `hints` over the surrounding text.
    pub async fn classify_with_hints(
        &self,
        raw: &str,
        worker: &WorkerId,
        context: &str,
        hints: &dyn CategoryHintPolicy,
    ) -> Option<String> {
        match self.classify(raw, worker).await {
            Some(slug) => Some(slug),
            None => hints.suggest(context),
        }
    }

    async fn link_category(&self, key: &str) -> Option<String> {
        let platform = Platform::from_key(key).filter(|p| p.is_link_authoritative())?;
        let slug = platform.category_slug()?;
        match self.store.get_category(slug).await {
            Ok(category) => category.map(|c| c.slug),
            Err(e) => {
                warn!(%key, category = slug, error = %e, "category lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadpool_contact::KeywordHints;
    use leadpool_core::{Category, NewContact};
    use leadpool_storage::{Database, SqliteStorage};
    use leadpool_config::model::StorageConfig;

    async fn store_with(categories: &[(&str, u32)]) -> Arc<dyn ContactStore> {
        let db = Database::open_in_memory().await.unwrap();
        let store = SqliteStorage::from_database(StorageConfig::default(), db);
        let categories: Vec<Category> = categories
            .iter()
            .enumerate()
            .map(|(i, (slug, quota))| Category {
                slug: slug.to_string(),
                name: slug.to_string(),
                base_quota: *quota,
                display_order: i as u32,
            })
            .collect();
        store.sync_categories(&categories).await.unwrap();
        Arc::new(store)
    }

    fn contact(value: &str) -> NewContact {
        NewContact {
            value: value.into(),
            normalized_key: leadpool_contact::normalize(value),
        }
    }

    #[tokio::test]
    async fn link_structure_decides_without_pool() {
        let store = store_with(&[("telegram", 1), ("vk", 1), ("instagram", 1)]).await;
        let classifier = Classifier::new(store, ContactNormalizer::default());
        let worker = WorkerId::from("w1");

        assert_eq!(
            classifier.classify("https://vk.com/id1", &worker).await.as_deref(),
            Some("vk")
        );
        assert_eq!(
            classifier.classify("instagram.com/shop", &worker).await.as_deref(),
            Some("instagram")
        );
        // Unconfigured platform falls through to the pool, which is empty.
        assert_eq!(classifier.classify("avito.ru/item/1", &worker).await, None);
    }

    #[tokio::test]
    async fn own_assignment_beats_global_pool() {
        let store = store_with(&[("whatsapp", 1), ("viber", 1)]).await;
        store
            .import_contacts("whatsapp", vec![contact("+7 912 000 11 22")])
            .await
            .unwrap();
        store
            .import_contacts("viber", vec![contact("89120001122")])
            .await
            .unwrap();
        let worker = WorkerId::from("w1");
        store.allocate("viber", &worker).await.unwrap();

        let classifier = Classifier::new(store, ContactNormalizer::default());
        assert_eq!(
            classifier.classify("79120001122", &worker).await.as_deref(),
            Some("viber")
        );
        // Someone else sees the first category by display order.
        assert_eq!(
            classifier
                .classify("79120001122", &WorkerId::from("w2"))
                .await
                .as_deref(),
            Some("whatsapp")
        );
    }

    #[tokio::test]
    async fn telegram_handles_go_through_the_pool() {
        let store = store_with(&[("telegram", 1), ("max", 1)]).await;
        store
            .import_contacts("max", vec![contact("@shared_handle")])
            .await
            .unwrap();
        let classifier = Classifier::new(store, ContactNormalizer::default());
        assert_eq!(
            classifier
                .classify("t.me/shared_handle", &WorkerId::from("w1"))
                .await
                .as_deref(),
            Some("max")
        );
    }

    #[tokio::test]
    async fn unknown_contacts_are_none_and_hints_are_last() {
        let store = store_with(&[("telegram", 1)]).await;
        let classifier = Classifier::new(store, ContactNormalizer::default());
        let worker = WorkerId::from("w1");

        assert_eq!(classifier.classify("   ", &worker).await, None);
        assert_eq!(classifier.classify("@nobody_here", &worker).await, None);

        let hints = KeywordHints::default();
        let hinted = classifier
            .classify_with_hints("@nobody_here", &worker, "нашла в вк", &hints)
            .await;
        assert_eq!(hinted.as_deref(), Some("vk"));
        let fallback = classifier
            .classify_with_hints("@nobody_here", &worker, "", &hints)
            .await;
        assert_eq!(fallback.as_deref(), Some("self"));
    }

    #[tokio::test]
    async fn storage_failure_reads_as_no_match() {
        let store: Arc<dyn ContactStore> = Arc::new(SqliteStorage::new(StorageConfig::default()));
        let classifier = Classifier::new(store, ContactNormalizer::default());
        assert_eq!(
            classifier.classify("@someone", &WorkerId::from("w1")).await,
            None
        );
    }
}
