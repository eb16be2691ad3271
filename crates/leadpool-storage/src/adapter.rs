// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the ContactStore trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use leadpool_config::model::StorageConfig;
use leadpool_core::{
    Allocation, Category, ClaimResult, Contact, ContactStore, HealthStatus, ImportReport, Lead,
    LeadPayload, LeadStatus, LeadpoolError, NewContact, PluginAdapter, PoolStats, WorkerId,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed contact store.
///
/// Wraps a [`Database`] handle and delegates every operation to the typed
/// query modules. The database is opened on the first call to
/// [`ContactStore::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// The database connection is not opened until [`ContactStore::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Wrap an already opened database (in-memory stores, tests).
    pub fn from_database(config: StorageConfig, db: Database) -> Self {
        Self {
            config,
            db: OnceCell::new_with(Some(db)),
        }
    }

    fn db(&self) -> Result<&Database, LeadpoolError> {
        self.db.get().ok_or_else(|| LeadpoolError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn health_check(&self) -> Result<HealthStatus, LeadpoolError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LeadpoolError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl ContactStore for SqliteStorage {
    async fn initialize(&self) -> Result<(), LeadpoolError> {
        let db = Database::open_with(&self.config).await?;
        self.db.set(db).map_err(|_| LeadpoolError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), LeadpoolError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    // --- Categories ---

    async fn sync_categories(&self, categories: &[Category]) -> Result<(), LeadpoolError> {
        queries::categories::sync_categories(self.db()?, categories).await
    }

    async fn list_categories(&self) -> Result<Vec<Category>, LeadpoolError> {
        queries::categories::list_categories(self.db()?).await
    }

    async fn get_category(&self, slug: &str) -> Result<Option<Category>, LeadpoolError> {
        queries::categories::get_category(self.db()?, slug).await
    }

    // --- Contact pool ---

    async fn import_contacts(
        &self,
        category: &str,
        contacts: Vec<NewContact>,
    ) -> Result<ImportReport, LeadpoolError> {
        queries::contacts::import_contacts(self.db()?, category, contacts).await
    }

    async fn allocate(
        &self,
        category: &str,
        worker: &WorkerId,
    ) -> Result<Allocation, LeadpoolError> {
        queries::contacts::allocate(self.db()?, category, worker).await
    }

    async fn pool_stats(&self, category: &str) -> Result<PoolStats, LeadpoolError> {
        queries::contacts::pool_stats(self.db()?, category).await
    }

    async fn find_category_by_key(
        &self,
        normalized_key: &str,
        assigned_to: Option<&WorkerId>,
    ) -> Result<Option<String>, LeadpoolError> {
        queries::contacts::find_category_by_key(self.db()?, normalized_key, assigned_to).await
    }

    async fn worker_contacts(&self, worker: &WorkerId) -> Result<Vec<Contact>, LeadpoolError> {
        queries::contacts::worker_contacts(self.db()?, worker).await
    }

    async fn reset_category(&self, category: &str) -> Result<u64, LeadpoolError> {
        queries::contacts::reset_category(self.db()?, category).await
    }

    async fn set_contact_active(
        &self,
        category: &str,
        value: &str,
        active: bool,
    ) -> Result<bool, LeadpoolError> {
        queries::contacts::set_contact_active(self.db()?, category, value, active).await
    }

    async fn detach_worker(&self, worker: &WorkerId) -> Result<u64, LeadpoolError> {
        queries::contacts::detach_worker(self.db()?, worker).await
    }

    // --- Quotas ---

    async fn grant_extra_quota(
        &self,
        worker: &WorkerId,
        category: &str,
        delta: u32,
    ) -> Result<u32, LeadpoolError> {
        queries::quotas::grant_extra_quota(self.db()?, worker, category, delta).await
    }

    async fn extra_quota(&self, worker: &WorkerId, category: &str) -> Result<u32, LeadpoolError> {
        queries::quotas::extra_quota(self.db()?, worker, category).await
    }

    // --- Leads ---

    async fn try_claim_lead(
        &self,
        normalized_key: &str,
        payload: &LeadPayload,
        exclude_lead_id: Option<i64>,
    ) -> Result<ClaimResult, LeadpoolError> {
        queries::leads::try_claim_lead(self.db()?, normalized_key, payload, exclude_lead_id).await
    }

    async fn set_lead_status(
        &self,
        lead_id: i64,
        status: LeadStatus,
    ) -> Result<Lead, LeadpoolError> {
        queries::leads::set_lead_status(self.db()?, lead_id, status).await
    }

    async fn get_lead(&self, lead_id: i64) -> Result<Option<Lead>, LeadpoolError> {
        queries::leads::get_lead(self.db()?, lead_id).await
    }

    async fn release_lead(&self, normalized_key: &str) -> Result<Option<Lead>, LeadpoolError> {
        queries::leads::release_lead(self.db()?, normalized_key).await
    }
}
