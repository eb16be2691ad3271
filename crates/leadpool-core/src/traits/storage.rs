// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store contract for categories, the contact pool, quotas, and leads.

use async_trait::async_trait;

use crate::error::LeadpoolError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    Allocation, Category, ClaimResult, Contact, ImportReport, Lead, LeadPayload, LeadStatus,
    NewContact, PoolStats, WorkerId,
};

/// Durable store behind the engine.
///
/// Implementations must make [`allocate`](ContactStore::allocate) and
/// [`try_claim_lead`](ContactStore::try_claim_lead) atomic: either the whole
/// read-count-write sequence happens or nothing changes. Lock timeouts must
/// surface as [`LeadpoolError::Contention`].
#[async_trait]
pub trait ContactStore: PluginAdapter {
    /// Opens the backend and applies migrations.
    async fn initialize(&self) -> Result<(), LeadpoolError>;

    /// Flushes pending writes and releases the backend.
    async fn close(&self) -> Result<(), LeadpoolError>;

    // --- Categories ---

    /// Inserts new categories and updates name, quota, and order of known ones.
    async fn sync_categories(&self, categories: &[Category]) -> Result<(), LeadpoolError>;

    /// All categories in display order.
    async fn list_categories(&self) -> Result<Vec<Category>, LeadpoolError>;

    async fn get_category(&self, slug: &str) -> Result<Option<Category>, LeadpoolError>;

    // --- Contact pool ---

    /// Inserts contacts, skipping values already present in the category.
    async fn import_contacts(
        &self,
        category: &str,
        contacts: Vec<NewContact>,
    ) -> Result<ImportReport, LeadpoolError>;

    /// Hands the worker every contact they are still entitled to, or nothing.
    async fn allocate(&self, category: &str, worker: &WorkerId)
        -> Result<Allocation, LeadpoolError>;

    async fn pool_stats(&self, category: &str) -> Result<PoolStats, LeadpoolError>;

    /// Category of the first contact whose key matches, optionally only among
    /// contacts assigned to `assigned_to`.
    async fn find_category_by_key(
        &self,
        normalized_key: &str,
        assigned_to: Option<&WorkerId>,
    ) -> Result<Option<String>, LeadpoolError>;

    /// Contacts issued to the worker, grouped by category display order.
    async fn worker_contacts(&self, worker: &WorkerId) -> Result<Vec<Contact>, LeadpoolError>;

    /// Clears assignment fields of every contact in the category.
    async fn reset_category(&self, category: &str) -> Result<u64, LeadpoolError>;

    /// Enables or disables one contact. Returns false if it does not exist.
    async fn set_contact_active(
        &self,
        category: &str,
        value: &str,
        active: bool,
    ) -> Result<bool, LeadpoolError>;

    /// Drops the worker's back-references and quota rows; contact history stays.
    async fn detach_worker(&self, worker: &WorkerId) -> Result<u64, LeadpoolError>;

    // --- Quotas ---

    /// Adds `delta` to the worker's extra quota. Returns the new extra amount.
    async fn grant_extra_quota(
        &self,
        worker: &WorkerId,
        category: &str,
        delta: u32,
    ) -> Result<u32, LeadpoolError>;

    async fn extra_quota(&self, worker: &WorkerId, category: &str) -> Result<u32, LeadpoolError>;

    // --- Leads ---

    /// Atomically claims `normalized_key` for the payload.
    ///
    /// With `exclude_lead_id` the excluded lead is the caller's own lead in
    /// `rework`; it is updated in place and moved back to `pending`.
    async fn try_claim_lead(
        &self,
        normalized_key: &str,
        payload: &LeadPayload,
        exclude_lead_id: Option<i64>,
    ) -> Result<ClaimResult, LeadpoolError>;

    /// Moderator decision on a pending lead. Never touches the key.
    async fn set_lead_status(&self, lead_id: i64, status: LeadStatus)
        -> Result<Lead, LeadpoolError>;

    async fn get_lead(&self, lead_id: i64) -> Result<Option<Lead>, LeadpoolError>;

    /// Deletes the lead holding `normalized_key`, freeing the key.
    async fn release_lead(&self, normalized_key: &str) -> Result<Option<Lead>, LeadpoolError>;
}
