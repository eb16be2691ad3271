// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for engine integration tests.
//!
//! `TestHarness` assembles a [`LeadEngine`] over a temp SQLite database
//! with the requested categories and seeded contacts. Every harness owns
//! its own database file, removed on drop.

use std::sync::Arc;

use leadpool_config::LeadpoolConfig;
use leadpool_config::model::{CategoryConfig, StorageConfig};
use leadpool_core::{ContactStore, LeadPayload, LeadpoolError, WorkerId};
use leadpool_engine::{LeadEngine, categories_from_config};
use leadpool_storage::SqliteStorage;

use crate::mock_store::ContendedStore;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    categories: Vec<CategoryConfig>,
    contacts: Vec<(String, Vec<String>)>,
    contention: Option<u32>,
    max_in_flight: Option<usize>,
    low_water_percent: Option<f64>,
    retries: Option<(u32, u64)>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            categories: Vec::new(),
            contacts: Vec::new(),
            contention: None,
            max_in_flight: None,
            low_water_percent: None,
            retries: None,
        }
    }

    /// Add a category. Without any, the default category set is used.
    pub fn with_category(mut self, slug: &str, base_quota: u32) -> Self {
        let display_order = self.categories.len() as u32;
        self.categories.push(CategoryConfig {
            slug: slug.to_string(),
            name: None,
            base_quota,
            display_order,
        });
        self
    }

    /// Import `values` into `category` after the categories are synced.
    pub fn with_contacts<I, S>(mut self, category: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.contacts.push((
            category.to_string(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Fail the first `failures` mutating store calls with contention.
    pub fn with_contention(mut self, failures: u32) -> Self {
        self.contention = Some(failures);
        self
    }

    pub fn with_max_in_flight(mut self, capacity: usize) -> Self {
        self.max_in_flight = Some(capacity);
        self
    }

    pub fn with_low_water(mut self, percent: f64) -> Self {
        self.low_water_percent = Some(percent);
        self
    }

    pub fn with_retries(mut self, max_retries: u32, backoff_ms: u64) -> Self {
        self.retries = Some((max_retries, backoff_ms));
        self
    }

    /// Build the harness: open the temp database, sync categories, seed contacts.
    pub async fn build(self) -> Result<TestHarness, LeadpoolError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| LeadpoolError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let mut config = LeadpoolConfig {
            storage: StorageConfig {
                database_path: db_path.to_string_lossy().to_string(),
                ..StorageConfig::default()
            },
            ..LeadpoolConfig::default()
        };
        if !self.categories.is_empty() {
            config.categories = self.categories;
        }
        if let Some(capacity) = self.max_in_flight {
            config.engine.max_in_flight = capacity;
        }
        if let Some(percent) = self.low_water_percent {
            config.allocation.low_water_percent = percent;
        }
        if let Some((max_retries, backoff_ms)) = self.retries {
            config.allocation.max_retries = max_retries;
            config.allocation.retry_backoff_ms = backoff_ms;
        }

        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        let storage: Arc<dyn ContactStore> = Arc::new(storage);

        let contended = self
            .contention
            .map(|_| Arc::new(ContendedStore::new(Arc::clone(&storage), 0)));
        let store: Arc<dyn ContactStore> = match &contended {
            Some(contended) => Arc::clone(contended) as Arc<dyn ContactStore>,
            None => storage,
        };

        let engine = LeadEngine::new(&config, store);
        engine
            .sync_categories(&categories_from_config(&config.categories))
            .await?;
        for (category, values) in self.contacts {
            engine.import_contacts(&category, values).await?;
        }
        if let (Some(contended), Some(failures)) = (&contended, self.contention) {
            contended.fail_next(failures);
        }

        Ok(TestHarness {
            engine: Arc::new(engine),
            contended,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment around one engine and one temp database.
pub struct TestHarness {
    /// The engine under test.
    pub engine: Arc<LeadEngine>,
    /// Contention injector, when built with `with_contention`.
    pub contended: Option<Arc<ContendedStore>>,
    /// Effective configuration.
    pub config: LeadpoolConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn worker(name: &str) -> WorkerId {
        WorkerId::from(name)
    }

    /// Lead payload with no category, source, or comment.
    pub fn lead(worker: &str, raw_contact: &str) -> LeadPayload {
        LeadPayload {
            worker_id: WorkerId::from(worker),
            category: None,
            raw_contact: raw_contact.to_string(),
            source: String::new(),
            comment: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadpool_core::AllocationOutcome;

    #[tokio::test]
    async fn builder_creates_working_environment() {
        let harness = TestHarness::builder().build().await.unwrap();
        let categories = harness.engine.list_categories().await.unwrap();
        assert_eq!(categories.len(), 8);
    }

    #[tokio::test]
    async fn seeded_contacts_are_allocatable() {
        let harness = TestHarness::builder()
            .with_category("telegram", 2)
            .with_contacts("telegram", ["@one_1", "@two_2", "@three_3"])
            .build()
            .await
            .unwrap();

        let stats = harness.engine.pool_stats("telegram").await.unwrap();
        assert_eq!((stats.free, stats.total), (3, 3));

        let allocation = harness
            .engine
            .request_allocation("telegram", &TestHarness::worker("w1"))
            .await
            .unwrap();
        assert_eq!(allocation.outcome, AllocationOutcome::Ok);
        assert_eq!(allocation.values, ["@one_1", "@two_2"]);
    }

    #[tokio::test]
    async fn temp_db_is_unique_per_harness() {
        let h1 = TestHarness::builder()
            .with_category("vk", 1)
            .with_contacts("vk", ["vk.com/id1"])
            .build()
            .await
            .unwrap();
        let h2 = TestHarness::builder().with_category("vk", 1).build().await.unwrap();

        assert_eq!(h1.engine.pool_stats("vk").await.unwrap().total, 1);
        assert_eq!(h2.engine.pool_stats("vk").await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn contention_is_injected_after_seeding() {
        let harness = TestHarness::builder()
            .with_category("vk", 1)
            .with_contacts("vk", ["vk.com/id1"])
            .with_contention(2)
            .with_retries(3, 1)
            .build()
            .await
            .unwrap();

        let allocation = harness
            .engine
            .request_allocation("vk", &TestHarness::worker("w1"))
            .await
            .unwrap();
        assert_eq!(allocation.outcome, AllocationOutcome::Ok);
        assert_eq!(harness.contended.as_ref().unwrap().failures_served(), 2);
    }
}
