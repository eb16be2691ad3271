// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Leadpool contact allocation and lead deduplication engine.
//!
//! This crate provides the error type, the domain types, and the store
//! contract shared by the storage backend and the engine.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::LeadpoolError;
pub use traits::{ContactStore, PluginAdapter};
pub use types::{
    Allocation, AllocationOutcome, Category, ClaimResult, Contact, HealthStatus, ImportReport,
    Lead, LeadConflict, LeadPayload, LeadStatus, NewContact, PoolStats, WorkerId,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_contention_is_retryable() {
        let contention = LeadpoolError::Contention {
            message: "database is locked".into(),
        };
        assert!(contention.is_retryable());

        let storage = LeadpoolError::Storage {
            source: Box::new(std::io::Error::other("disk")),
        };
        assert!(!storage.is_retryable());
        assert!(!LeadpoolError::UnknownCategory("x".into()).is_retryable());
        assert!(!LeadpoolError::InvalidContact(String::new()).is_retryable());
    }

    #[test]
    fn allocation_outcome_display_and_parse() {
        use std::str::FromStr;

        let variants = [
            AllocationOutcome::Ok,
            AllocationOutcome::AlreadyAtLimit,
            AllocationOutcome::InsufficientSupply,
        ];
        for variant in &variants {
            let s = variant.to_string();
            let parsed = AllocationOutcome::from_str(&s).expect("should parse back");
            assert_eq!(*variant, parsed);
        }
        assert_eq!(AllocationOutcome::AlreadyAtLimit.to_string(), "already_at_limit");
    }

    #[test]
    fn lead_status_serializes_snake_case() {
        let json = serde_json::to_string(&LeadStatus::Rework).expect("should serialize");
        assert_eq!(json, "\"rework\"");
        let parsed: LeadStatus = serde_json::from_str("\"approved\"").expect("should deserialize");
        assert_eq!(parsed, LeadStatus::Approved);
    }

    #[test]
    fn moderation_only_leaves_pending() {
        use LeadStatus::*;

        assert!(Pending.can_moderate_to(Approved));
        assert!(Pending.can_moderate_to(Rejected));
        assert!(Pending.can_moderate_to(Rework));
        assert!(!Pending.can_moderate_to(Pending));
        assert!(!Approved.can_moderate_to(Rejected));
        assert!(!Rework.can_moderate_to(Pending));
        assert!(!Rejected.can_moderate_to(Approved));
    }

    #[test]
    fn pool_stats_low_water() {
        let stats = PoolStats { free: 4, total: 100 };
        assert!(stats.is_below_low_water(5.0));
        assert!(!stats.is_below_low_water(4.0));

        let empty = PoolStats::default();
        assert_eq!(empty.free_percent(), None);
        assert!(!empty.is_below_low_water(5.0));
    }

    #[test]
    fn claim_result_exposes_conflict() {
        let accepted = ClaimResult::Accepted { lead_id: 7 };
        assert!(accepted.is_accepted());
        assert!(accepted.conflict().is_none());

        let duplicate = ClaimResult::Duplicate(LeadConflict {
            lead_id: 1,
            worker_id: WorkerId::from("b"),
            category: Some("vk".into()),
            status: LeadStatus::Pending,
        });
        assert!(!duplicate.is_accepted());
        assert_eq!(duplicate.conflict().map(|c| c.worker_id.as_str()), Some("b"));
    }

    #[test]
    fn contact_store_is_object_safe() {
        fn _assert_object_safe(_: &dyn ContactStore) {}
    }
}
