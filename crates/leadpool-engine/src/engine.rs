// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The engine facade consumed by request handlers.

use std::sync::Arc;

use leadpool_config::LeadpoolConfig;
use leadpool_config::model::CategoryConfig;
use leadpool_contact::{CategoryHintPolicy, ContactExtractor, ContactNormalizer, KeywordHints};
use leadpool_core::{
    Allocation, Category, ClaimResult, Contact, ContactStore, ImportReport, Lead, LeadPayload,
    LeadStatus, LeadpoolError, PoolStats, WorkerId,
};
use leadpool_storage::SqliteStorage;
use tracing::{debug, info};

use crate::allocator::Allocator;
use crate::classifier::Classifier;
use crate::dedup::LeadIndex;
use crate::import::prepare_contacts;
use crate::retry::RetryPolicy;

/// Store-facing category records for the configured categories.
pub fn categories_from_config(categories: &[CategoryConfig]) -> Vec<Category> {
    categories
        .iter()
        .map(|c| Category {
            slug: c.slug.clone(),
            name: c.name.clone().unwrap_or_else(|| c.slug.clone()),
            base_quota: c.base_quota,
            display_order: c.display_order,
        })
        .collect()
}

/// Contact allocation and lead deduplication over one [`ContactStore`].
///
/// Cheap text operations (`normalize`, `extract`, `contact_url`) are
/// synchronous and infallible. Everything that touches the store is async.
pub struct LeadEngine {
    store: Arc<dyn ContactStore>,
    extractor: ContactExtractor,
    classifier: Classifier,
    allocator: Allocator,
    leads: LeadIndex,
    retry: RetryPolicy,
    hints: Box<dyn CategoryHintPolicy>,
}

impl LeadEngine {
    /// Build an engine over an initialized store.
    pub fn new(config: &LeadpoolConfig, store: Arc<dyn ContactStore>) -> Self {
        let normalizer = ContactNormalizer::from_config(&config.normalize);
        let retry = RetryPolicy::from_config(&config.allocation);
        Self {
            extractor: ContactExtractor::new(normalizer.clone()),
            classifier: Classifier::new(Arc::clone(&store), normalizer.clone()),
            allocator: Allocator::new(
                Arc::clone(&store),
                &config.allocation,
                config.engine.max_in_flight,
            ),
            leads: LeadIndex::new(Arc::clone(&store), normalizer, retry),
            retry,
            hints: Box::new(KeywordHints::default()),
            store,
        }
    }

    /// Open the SQLite store named by `config`, apply migrations, and sync
    /// the configured categories.
    pub async fn open(config: &LeadpoolConfig) -> Result<Self, LeadpoolError> {
        let store = SqliteStorage::new(config.storage.clone());
        store.initialize().await?;
        let engine = Self::new(config, Arc::new(store));
        engine
            .sync_categories(&categories_from_config(&config.categories))
            .await?;
        Ok(engine)
    }

    /// Replace the keyword policy used by [`classify_with_hints`](Self::classify_with_hints).
    pub fn with_hint_policy(mut self, hints: impl CategoryHintPolicy + 'static) -> Self {
        self.hints = Box::new(hints);
        self
    }

    pub fn store(&self) -> &Arc<dyn ContactStore> {
        &self.store
    }

    pub fn allocator(&self) -> &Allocator {
        &self.allocator
    }

    // --- Text ---

    pub fn normalize(&self, raw: &str) -> String {
        self.extractor.normalizer().normalize(raw)
    }

    pub fn extract(&self, text: &str) -> Vec<String> {
        self.extractor.extract(text)
    }

    /// Clickable profile URL for a raw contact.
    pub fn contact_url(&self, raw: &str) -> Option<String> {
        self.extractor.normalizer().contact_url(raw)
    }

    // --- Classification ---

    pub async fn classify(&self, raw: &str, worker: &WorkerId) -> Option<String> {
        self.classifier.classify(raw, worker).await
    }

    /// Structural classification, then the keyword policy over `context`.
    pub async fn classify_with_hints(
        &self,
        raw: &str,
        worker: &WorkerId,
        context: &str,
    ) -> Option<String> {
        self.classifier
            .classify_with_hints(raw, worker, context, self.hints.as_ref())
            .await
    }

    // --- Contact pool ---

    pub async fn request_allocation(
        &self,
        category: &str,
        worker: &WorkerId,
    ) -> Result<Allocation, LeadpoolError> {
        self.allocator.request_allocation(category, worker).await
    }

    /// Raise a worker's quota in `category` by `delta`. Returns the new extra.
    ///
    /// Quotas only grow: a negative or oversized delta is refused.
    pub async fn grant_extra_quota(
        &self,
        worker: &WorkerId,
        category: &str,
        delta: i64,
    ) -> Result<u32, LeadpoolError> {
        let delta = u32::try_from(delta).map_err(|_| {
            LeadpoolError::InvalidArgument(format!(
                "quota delta must be between 0 and {}, got {delta}",
                u32::MAX
            ))
        })?;
        let extra = self
            .retry
            .run("grant_extra_quota", || {
                self.store.grant_extra_quota(worker, category, delta)
            })
            .await?;
        info!(worker = %worker, category, delta, extra, "extra quota granted");
        Ok(extra)
    }

    pub async fn extra_quota(&self, worker: &WorkerId, category: &str) -> Result<u32, LeadpoolError> {
        self.store.extra_quota(worker, category).await
    }

    /// Free and total counts. Compare with
    /// [`PoolStats::is_below_low_water`] to alert operators.
    pub async fn pool_stats(&self, category: &str) -> Result<PoolStats, LeadpoolError> {
        self.store.pool_stats(category).await
    }

    /// Clean, normalize, and insert contact values into a category.
    pub async fn import_contacts<I, S>(
        &self,
        category: &str,
        values: I,
    ) -> Result<ImportReport, LeadpoolError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let contacts = prepare_contacts(values, self.extractor.normalizer());
        let report = self.store.import_contacts(category, contacts).await?;
        info!(
            category,
            submitted = report.submitted,
            inserted = report.inserted,
            skipped = report.skipped,
            "contacts imported"
        );
        Ok(report)
    }

    pub async fn sync_categories(&self, categories: &[Category]) -> Result<(), LeadpoolError> {
        self.store.sync_categories(categories).await?;
        debug!(count = categories.len(), "categories synced");
        Ok(())
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, LeadpoolError> {
        self.store.list_categories().await
    }

    /// Return every contact of a category to the free pool.
    pub async fn reset_category(&self, category: &str) -> Result<u64, LeadpoolError> {
        let reset = self
            .retry
            .run("reset_category", || self.store.reset_category(category))
            .await?;
        info!(category, reset, "category assignments cleared");
        Ok(reset)
    }

    pub async fn set_contact_active(
        &self,
        category: &str,
        value: &str,
        active: bool,
    ) -> Result<bool, LeadpoolError> {
        self.store.set_contact_active(category, value, active).await
    }

    /// Forget a worker: back-references and quota grants go, history stays.
    pub async fn detach_worker(&self, worker: &WorkerId) -> Result<u64, LeadpoolError> {
        let detached = self
            .retry
            .run("detach_worker", || self.store.detach_worker(worker))
            .await?;
        info!(worker = %worker, detached, "worker detached");
        Ok(detached)
    }

    pub async fn worker_contacts(&self, worker: &WorkerId) -> Result<Vec<Contact>, LeadpoolError> {
        self.store.worker_contacts(worker).await
    }

    // --- Leads ---

    /// Claim a key computed by the caller.
    pub async fn try_claim_lead(
        &self,
        normalized_key: &str,
        payload: &LeadPayload,
        exclude_lead_id: Option<i64>,
    ) -> Result<ClaimResult, LeadpoolError> {
        self.leads
            .try_claim(normalized_key, payload, exclude_lead_id)
            .await
    }

    /// Normalize the payload's contact and claim its key.
    pub async fn submit_lead(&self, payload: &LeadPayload) -> Result<ClaimResult, LeadpoolError> {
        self.leads.submit(payload).await
    }

    pub async fn resubmit_lead(
        &self,
        lead_id: i64,
        worker: &WorkerId,
        raw_contact: &str,
    ) -> Result<ClaimResult, LeadpoolError> {
        self.leads.resubmit(lead_id, worker, raw_contact).await
    }

    pub async fn set_lead_status(
        &self,
        lead_id: i64,
        status: LeadStatus,
    ) -> Result<Lead, LeadpoolError> {
        self.leads.set_status(lead_id, status).await
    }

    pub async fn release_lead(&self, raw_contact: &str) -> Result<Option<Lead>, LeadpoolError> {
        self.leads.release(raw_contact).await
    }

    pub async fn get_lead(&self, lead_id: i64) -> Result<Option<Lead>, LeadpoolError> {
        self.leads.get(lead_id).await
    }

    /// Checkpoint and release the store.
    pub async fn shutdown(&self) -> Result<(), LeadpoolError> {
        self.store.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadpool_core::AllocationOutcome;
    use leadpool_storage::Database;

    async fn engine() -> LeadEngine {
        let config = LeadpoolConfig::default();
        let db = Database::open_in_memory().await.unwrap();
        let store = SqliteStorage::from_database(config.storage.clone(), db);
        let engine = LeadEngine::new(&config, Arc::new(store));
        engine
            .sync_categories(&categories_from_config(&config.categories))
            .await
            .unwrap();
        engine
    }

    #[test]
    fn config_categories_default_name_to_slug() {
        let categories = categories_from_config(&[CategoryConfig {
            slug: "avito".into(),
            name: None,
            base_quota: 10,
            display_order: 9,
        }]);
        assert_eq!(categories[0].name, "avito");
        assert_eq!(categories[0].base_quota, 10);
    }

    #[tokio::test]
    async fn default_categories_are_synced() {
        let engine = engine().await;
        let slugs: Vec<String> = engine
            .list_categories()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.slug)
            .collect();
        assert_eq!(slugs.len(), 8);
        assert_eq!(slugs[0], "telegram");
    }

    #[tokio::test]
    async fn negative_grant_is_refused() {
        let engine = engine().await;
        let worker = WorkerId::from("w1");
        let err = engine
            .grant_extra_quota(&worker, "telegram", -5)
            .await
            .unwrap_err();
        assert!(matches!(err, LeadpoolError::InvalidArgument(_)));
        assert_eq!(engine.grant_extra_quota(&worker, "telegram", 5).await.unwrap(), 5);
        assert_eq!(engine.extra_quota(&worker, "telegram").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn import_then_allocate() {
        let engine = engine().await;
        let report = engine
            .import_contacts("viber", ["Контакт", "=+79120000001", "+79120000002", "+79120000002"])
            .await
            .unwrap();
        assert_eq!(report.submitted, 2);
        assert_eq!(report.inserted, 2);

        let again = engine
            .import_contacts("viber", ["+79120000001"])
            .await
            .unwrap();
        assert_eq!(again.skipped, 1);

        // Default viber quota is 35, more than the pool holds.
        let result = engine
            .request_allocation("viber", &WorkerId::from("w1"))
            .await
            .unwrap();
        assert_eq!(result.outcome, AllocationOutcome::InsufficientSupply);
    }

    #[tokio::test]
    async fn text_helpers() {
        let engine = engine().await;
        assert_eq!(engine.normalize("8 (912) 345-67-89"), "phone:79123456789");
        assert_eq!(
            engine.contact_url("@anna_smile").as_deref(),
            Some("https://t.me/anna_smile")
        );
        assert_eq!(engine.extract("пишите @ivan_petrov").len(), 1);
    }
}
