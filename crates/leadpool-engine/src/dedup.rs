// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lead submission against the global normalized-key duplicate index.

use std::sync::Arc;

use leadpool_contact::ContactNormalizer;
use leadpool_core::{
    ClaimResult, ContactStore, Lead, LeadPayload, LeadStatus, LeadpoolError, WorkerId,
};
use tracing::info;

use crate::retry::RetryPolicy;

/// Claims normalized keys for leads and moves leads through moderation.
///
/// Keys are computed here, never taken from the caller's payload, and an
/// empty key is refused before the store is touched.
pub struct LeadIndex {
    store: Arc<dyn ContactStore>,
    normalizer: ContactNormalizer,
    retry: RetryPolicy,
}

impl LeadIndex {
    pub fn new(store: Arc<dyn ContactStore>, normalizer: ContactNormalizer, retry: RetryPolicy) -> Self {
        Self {
            store,
            normalizer,
            retry,
        }
    }

    fn key_for(&self, raw: &str) -> Result<String, LeadpoolError> {
        let key = self.normalizer.normalize(raw);
        if key.is_empty() {
            return Err(LeadpoolError::InvalidContact(raw.to_string()));
        }
        Ok(key)
    }

    /// Claim an already computed key. `exclude_lead_id` is the lead being
    /// resubmitted, whose own row must not count as a conflict.
    pub async fn try_claim(
        &self,
        normalized_key: &str,
        payload: &LeadPayload,
        exclude_lead_id: Option<i64>,
    ) -> Result<ClaimResult, LeadpoolError> {
        if normalized_key.is_empty() {
            return Err(LeadpoolError::InvalidContact(payload.raw_contact.clone()));
        }
        let result = self
            .retry
            .run("claim_lead", || {
                self.store
                    .try_claim_lead(normalized_key, payload, exclude_lead_id)
            })
            .await?;
        match &result {
            ClaimResult::Accepted { lead_id } => info!(
                lead_id,
                worker = %payload.worker_id,
                key = normalized_key,
                "lead accepted"
            ),
            ClaimResult::Duplicate(conflict) => info!(
                worker = %payload.worker_id,
                key = normalized_key,
                owner = %conflict.worker_id,
                owner_lead = conflict.lead_id,
                "duplicate lead rejected"
            ),
        }
        Ok(result)
    }

    /// Fresh submission: normalize the raw contact and claim its key.
    pub async fn submit(&self, payload: &LeadPayload) -> Result<ClaimResult, LeadpoolError> {
        let key = self.key_for(&payload.raw_contact)?;
        self.try_claim(&key, payload, None).await
    }

    /// Resubmit a lead sent back for rework with a corrected contact.
    ///
    /// Category, source and comment are kept; the key is recomputed and
    /// checked against every other lead. On success the lead is `pending`.
    pub async fn resubmit(
        &self,
        lead_id: i64,
        worker: &WorkerId,
        raw_contact: &str,
    ) -> Result<ClaimResult, LeadpoolError> {
        let key = self.key_for(raw_contact)?;
        let lead = self
            .store
            .get_lead(lead_id)
            .await?
            .filter(|lead| &lead.worker_id == worker)
            .ok_or(LeadpoolError::LeadNotFound(lead_id))?;
        let payload = LeadPayload {
            worker_id: worker.clone(),
            category: lead.category,
            raw_contact: raw_contact.trim().to_string(),
            source: lead.source,
            comment: lead.comment,
        };
        self.try_claim(&key, &payload, Some(lead_id)).await
    }

    pub async fn set_status(&self, lead_id: i64, status: LeadStatus) -> Result<Lead, LeadpoolError> {
        let lead = self
            .retry
            .run("set_lead_status", || self.store.set_lead_status(lead_id, status))
            .await?;
        info!(lead_id, status = %status, "lead moderated");
        Ok(lead)
    }

    /// Delete whichever lead holds the key of `raw_contact`.
    pub async fn release(&self, raw_contact: &str) -> Result<Option<Lead>, LeadpoolError> {
        let key = self.key_for(raw_contact)?;
        let released = self
            .retry
            .run("release_lead", || self.store.release_lead(&key))
            .await?;
        if let Some(lead) = &released {
            info!(lead_id = lead.id, key = %key, "lead released");
        }
        Ok(released)
    }

    pub async fn get(&self, lead_id: i64) -> Result<Option<Lead>, LeadpoolError> {
        self.store.get_lead(lead_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadpool_config::model::StorageConfig;
    use leadpool_storage::{Database, SqliteStorage};

    async fn index() -> LeadIndex {
        let db = Database::open_in_memory().await.unwrap();
        let store = SqliteStorage::from_database(StorageConfig::default(), db);
        LeadIndex::new(Arc::new(store), ContactNormalizer::default(), RetryPolicy::none())
    }

    fn payload(worker: &str, raw: &str) -> LeadPayload {
        LeadPayload {
            worker_id: WorkerId::from(worker),
            category: None,
            raw_contact: raw.into(),
            source: "chat".into(),
            comment: String::new(),
        }
    }

    #[tokio::test]
    async fn textual_variants_collide() {
        let index = index().await;
        let first = index.submit(&payload("worker-b", "vk.com/id100500?utm=1")).await.unwrap();
        assert!(first.is_accepted());

        let second = index.submit(&payload("worker-c", "VK.RU/id100500")).await.unwrap();
        assert_eq!(second.conflict().unwrap().worker_id.as_str(), "worker-b");
    }

    #[tokio::test]
    async fn blank_contact_is_refused() {
        let index = index().await;
        let err = index.submit(&payload("w1", "   ")).await.unwrap_err();
        assert!(matches!(err, LeadpoolError::InvalidContact(_)));
        assert!(index.release("").await.is_err());
    }

    #[tokio::test]
    async fn rework_cycle() {
        let index = index().await;
        let ClaimResult::Accepted { lead_id } =
            index.submit(&payload("w1", "@typo_name")).await.unwrap()
        else {
            panic!("expected accepted claim");
        };
        index.set_status(lead_id, LeadStatus::Rework).await.unwrap();

        let fixed = index
            .resubmit(lead_id, &WorkerId::from("w1"), "@right_name")
            .await
            .unwrap();
        assert_eq!(fixed, ClaimResult::Accepted { lead_id });
        let lead = index.get(lead_id).await.unwrap().unwrap();
        assert_eq!(lead.normalized_key, "telegram:right_name");
        assert_eq!(lead.status, LeadStatus::Pending);
        assert_eq!(lead.source, "chat");

        // The old key is free again.
        assert!(index.submit(&payload("w2", "t.me/typo_name")).await.unwrap().is_accepted());
    }

    #[tokio::test]
    async fn resubmit_checks_owner() {
        let index = index().await;
        let ClaimResult::Accepted { lead_id } = index.submit(&payload("w1", "@abc_1")).await.unwrap()
        else {
            panic!("expected accepted claim");
        };
        let err = index
            .resubmit(lead_id, &WorkerId::from("intruder"), "@abc_2")
            .await
            .unwrap_err();
        assert!(matches!(err, LeadpoolError::LeadNotFound(_)));
    }
}
