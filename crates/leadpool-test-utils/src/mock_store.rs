// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store wrapper that injects lock contention for retry tests.
//!
//! `ContendedStore` forwards every call to an inner [`ContactStore`], but
//! fails the next N mutating calls (allocation, claim, grant) with
//! [`LeadpoolError::Contention`] before they reach it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use leadpool_core::{
    Allocation, Category, ClaimResult, Contact, ContactStore, HealthStatus, ImportReport, Lead,
    LeadPayload, LeadStatus, LeadpoolError, NewContact, PluginAdapter, PoolStats, WorkerId,
};

pub struct ContendedStore {
    inner: Arc<dyn ContactStore>,
    failures_left: AtomicU32,
    failures_served: AtomicU32,
}

impl ContendedStore {
    /// Wrap `inner`, failing the next `failures` mutating calls.
    pub fn new(inner: Arc<dyn ContactStore>, failures: u32) -> Self {
        Self {
            inner,
            failures_left: AtomicU32::new(failures),
            failures_served: AtomicU32::new(0),
        }
    }

    /// Fail the next `failures` mutating calls.
    pub fn fail_next(&self, failures: u32) {
        self.failures_left.store(failures, Ordering::SeqCst);
    }

    /// How many injected contention errors were returned so far.
    pub fn failures_served(&self) -> u32 {
        self.failures_served.load(Ordering::SeqCst)
    }

    fn maybe_contend(&self) -> Result<(), LeadpoolError> {
        let took = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if took {
            self.failures_served.fetch_add(1, Ordering::SeqCst);
            return Err(LeadpoolError::Contention {
                message: "injected: database is locked".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for ContendedStore {
    fn name(&self) -> &str {
        "contended-store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn health_check(&self) -> Result<HealthStatus, LeadpoolError> {
        self.inner.health_check().await
    }

    async fn shutdown(&self) -> Result<(), LeadpoolError> {
        self.inner.shutdown().await
    }
}

#[async_trait]
impl ContactStore for ContendedStore {
    async fn initialize(&self) -> Result<(), LeadpoolError> {
        self.inner.initialize().await
    }

    async fn close(&self) -> Result<(), LeadpoolError> {
        self.inner.close().await
    }

    async fn sync_categories(&self, categories: &[Category]) -> Result<(), LeadpoolError> {
        self.inner.sync_categories(categories).await
    }

    async fn list_categories(&self) -> Result<Vec<Category>, LeadpoolError> {
        self.inner.list_categories().await
    }

    async fn get_category(&self, slug: &str) -> Result<Option<Category>, LeadpoolError> {
        self.inner.get_category(slug).await
    }

    async fn import_contacts(
        &self,
        category: &str,
        contacts: Vec<NewContact>,
    ) -> Result<ImportReport, LeadpoolError> {
        self.inner.import_contacts(category, contacts).await
    }

    async fn allocate(
        &self,
        category: &str,
        worker: &WorkerId,
    ) -> Result<Allocation, LeadpoolError> {
        self.maybe_contend()?;
        self.inner.allocate(category, worker).await
    }

    async fn pool_stats(&self, category: &str) -> Result<PoolStats, LeadpoolError> {
        self.inner.pool_stats(category).await
    }

    async fn find_category_by_key(
        &self,
        normalized_key: &str,
        assigned_to: Option<&WorkerId>,
    ) -> Result<Option<String>, LeadpoolError> {
        self.inner
            .find_category_by_key(normalized_key, assigned_to)
            .await
    }

    async fn worker_contacts(&self, worker: &WorkerId) -> Result<Vec<Contact>, LeadpoolError> {
        self.inner.worker_contacts(worker).await
    }

    async fn reset_category(&self, category: &str) -> Result<u64, LeadpoolError> {
        self.inner.reset_category(category).await
    }

    async fn set_contact_active(
        &self,
        category: &str,
        value: &str,
        active: bool,
    ) -> Result<bool, LeadpoolError> {
        self.inner.set_contact_active(category, value, active).await
    }

    async fn detach_worker(&self, worker: &WorkerId) -> Result<u64, LeadpoolError> {
        self.inner.detach_worker(worker).await
    }

    async fn grant_extra_quota(
        &self,
        worker: &WorkerId,
        category: &str,
        delta: u32,
    ) -> Result<u32, LeadpoolError> {
        self.maybe_contend()?;
        self.inner.grant_extra_quota(worker, category, delta).await
    }

    async fn extra_quota(&self, worker: &WorkerId, category: &str) -> Result<u32, LeadpoolError> {
        self.inner.extra_quota(worker, category).await
    }

    async fn try_claim_lead(
        &self,
        normalized_key: &str,
        payload: &LeadPayload,
        exclude_lead_id: Option<i64>,
    ) -> Result<ClaimResult, LeadpoolError> {
        self.maybe_contend()?;
        self.inner
            .try_claim_lead(normalized_key, payload, exclude_lead_id)
            .await
    }

    async fn set_lead_status(
        &self,
        lead_id: i64,
        status: LeadStatus,
    ) -> Result<Lead, LeadpoolError> {
        self.inner.set_lead_status(lead_id, status).await
    }

    async fn get_lead(&self, lead_id: i64) -> Result<Option<Lead>, LeadpoolError> {
        self.inner.get_lead(lead_id).await
    }

    async fn release_lead(&self, normalized_key: &str) -> Result<Option<Lead>, LeadpoolError> {
        self.inner.release_lead(normalized_key).await
    }
}
