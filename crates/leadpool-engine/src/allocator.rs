// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Allocation requests: in-flight guard, contention retry, and pool alerts.
//!
//! The all-or-nothing quota arithmetic runs inside the store, atomically.
//! This layer decides what happens around it: a repeat click from the same
//! worker is refused, lock timeouts are retried with backoff, and a `warn`
//! goes out when the pool runs low or cannot cover a request.
//!
//! Allocations are serialized per category, so a slow or retrying request in
//! one category never holds up another. Storage still has a single writer;
//! distinct categories overlap everywhere except the write itself.

use std::sync::Arc;

use dashmap::DashMap;

use leadpool_config::model::AllocationConfig;
use leadpool_core::{Allocation, AllocationOutcome, ContactStore, LeadpoolError, WorkerId};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::inflight::InFlightSet;
use crate::retry::RetryPolicy;

pub struct Allocator {
    store: Arc<dyn ContactStore>,
    in_flight: InFlightSet,
    category_locks: DashMap<String, Arc<Mutex<()>>>,
    retry: RetryPolicy,
    low_water_percent: f64,
}

impl Allocator {
    pub fn new(store: Arc<dyn ContactStore>, config: &AllocationConfig, max_in_flight: usize) -> Self {
        Self {
            store,
            in_flight: InFlightSet::new(max_in_flight),
            category_locks: DashMap::new(),
            retry: RetryPolicy::from_config(config),
            low_water_percent: config.low_water_percent,
        }
    }

    pub fn in_flight(&self) -> &InFlightSet {
        &self.in_flight
    }

    fn category_lock(&self, category: &str) -> Arc<Mutex<()>> {
        // Cloned out so no shard lock is held across an await.
        Arc::clone(
            self.category_locks
                .entry(category.to_string())
                .or_default()
                .value(),
        )
    }

    /// Hand the worker every contact they are still entitled to in `category`.
    ///
    /// `AlreadyAtLimit` and `InsufficientSupply` come back as outcomes with an
    /// empty value list. Errors are reserved for unknown categories, a request
    /// already running for the same worker and category, and storage failures
    /// that outlived the retry budget.
    pub async fn request_allocation(
        &self,
        category: &str,
        worker: &WorkerId,
    ) -> Result<Allocation, LeadpoolError> {
        let _guard = self.in_flight.try_acquire(worker, category)?;
        let lock = self.category_lock(category);
        let allocation = {
            let _serial = lock.lock().await;
            self.retry
                .run("allocate", || self.store.allocate(category, worker))
                .await?
        };

        match allocation.outcome {
            AllocationOutcome::Ok => {
                info!(
                    category,
                    worker = %worker,
                    issued = allocation.values.len(),
                    free = allocation.stats.free,
                    total = allocation.stats.total,
                    "contacts allocated"
                );
                self.check_low_water(&allocation);
            }
            AllocationOutcome::AlreadyAtLimit => {
                debug!(
                    category,
                    worker = %worker,
                    allowed = allocation.total_allowed,
                    "worker already holds full quota"
                );
            }
            AllocationOutcome::InsufficientSupply => {
                warn!(
                    category,
                    worker = %worker,
                    needed = allocation.total_allowed.saturating_sub(allocation.already_issued),
                    free = allocation.stats.free,
                    "not enough free contacts to cover allocation"
                );
            }
        }
        Ok(allocation)
    }

    fn check_low_water(&self, allocation: &Allocation) {
        if allocation.stats.is_below_low_water(self.low_water_percent) {
            warn!(
                category = %allocation.category,
                free = allocation.stats.free,
                total = allocation.stats.total,
                threshold_percent = self.low_water_percent,
                "contact pool below low-water mark"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadpool_config::model::StorageConfig;
    use leadpool_core::{Category, NewContact};
    use leadpool_storage::{Database, SqliteStorage};
    use std::time::Duration;
    use tracing_test::traced_test;

    async fn allocator(quota: u32, free: usize) -> Allocator {
        let db = Database::open_in_memory().await.unwrap();
        let store = SqliteStorage::from_database(StorageConfig::default(), db);
        store
            .sync_categories(&[Category {
                slug: "instagram".into(),
                name: "Instagram".into(),
                base_quota: quota,
                display_order: 0,
            }])
            .await
            .unwrap();
        let contacts = (0..free)
            .map(|i| NewContact {
                value: format!("instagram.com/shop{i}"),
                normalized_key: format!("ig:shop{i}"),
            })
            .collect();
        store.import_contacts("instagram", contacts).await.unwrap();
        Allocator::new(Arc::new(store), &AllocationConfig::default(), 16)
    }

    #[tokio::test]
    #[traced_test]
    async fn low_water_mark_is_logged() {
        let allocator = allocator(10, 20).await;
        allocator
            .request_allocation("instagram", &WorkerId::from("w1"))
            .await
            .unwrap();
        assert!(!logs_contain("low-water mark"));

        // Second worker drains the pool.
        let second = allocator
            .request_allocation("instagram", &WorkerId::from("w2"))
            .await
            .unwrap();
        assert_eq!(second.stats.free, 0);
        assert!(logs_contain("contact pool below low-water mark"));
    }

    #[tokio::test]
    #[traced_test]
    async fn insufficient_supply_is_logged() {
        let allocator = allocator(5, 3).await;
        let result = allocator
            .request_allocation("instagram", &WorkerId::from("w1"))
            .await
            .unwrap();
        assert_eq!(result.outcome, AllocationOutcome::InsufficientSupply);
        assert!(logs_contain("not enough free contacts"));
    }

    #[tokio::test]
    async fn guard_is_released_after_each_request() {
        let allocator = allocator(1, 2).await;
        let worker = WorkerId::from("w1");
        allocator.request_allocation("instagram", &worker).await.unwrap();
        assert!(allocator.in_flight().is_empty());

        let again = allocator.request_allocation("instagram", &worker).await.unwrap();
        assert_eq!(again.outcome, AllocationOutcome::AlreadyAtLimit);

        let err = allocator.request_allocation("fax", &worker).await.unwrap_err();
        assert!(matches!(err, LeadpoolError::UnknownCategory(_)));
        assert!(allocator.in_flight().is_empty());
    }

    #[tokio::test]
    async fn held_guard_refuses_repeat_request() {
        let allocator = allocator(1, 2).await;
        let worker = WorkerId::from("w1");
        let _held = allocator.in_flight().try_acquire(&worker, "instagram").unwrap();
        let err = allocator
            .request_allocation("instagram", &worker)
            .await
            .unwrap_err();
        assert!(matches!(err, LeadpoolError::InFlight { .. }));
    }

    #[tokio::test]
    async fn busy_category_does_not_hold_up_another() {
        let db = Database::open_in_memory().await.unwrap();
        let store = SqliteStorage::from_database(StorageConfig::default(), db);
        let categories: Vec<Category> = ["telegram", "vk"]
            .into_iter()
            .enumerate()
            .map(|(i, slug)| Category {
                slug: slug.into(),
                name: slug.into(),
                base_quota: 1,
                display_order: i as u32,
            })
            .collect();
        store.sync_categories(&categories).await.unwrap();
        for slug in ["telegram", "vk"] {
            let contacts = (0..3)
                .map(|i| NewContact {
                    value: format!("{slug}_user{i}"),
                    normalized_key: format!("{slug}:user{i}"),
                })
                .collect();
            store.import_contacts(slug, contacts).await.unwrap();
        }
        let allocator = Allocator::new(Arc::new(store), &AllocationConfig::default(), 16);

        // A long-running telegram allocation owns its category.
        let telegram = allocator.category_lock("telegram");
        let _busy = telegram.lock().await;

        let vk = tokio::time::timeout(
            Duration::from_millis(500),
            allocator.request_allocation("vk", &WorkerId::from("w1")),
        )
        .await
        .expect("vk allocation waited on telegram")
        .unwrap();
        assert_eq!(vk.outcome, AllocationOutcome::Ok);

        let queued = tokio::time::timeout(
            Duration::from_millis(50),
            allocator.request_allocation("telegram", &WorkerId::from("w2")),
        )
        .await;
        assert!(queued.is_err());
        assert!(allocator.in_flight().is_empty());
    }
}
