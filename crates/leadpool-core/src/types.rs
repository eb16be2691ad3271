// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the store contract, the engine, and its callers.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identity of a worker as known to the surrounding system (bot user id, login, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerId(pub String);

impl WorkerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for WorkerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// A named partition of the contact pool with its base per-worker quota.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Stable system name (`telegram`, `vk`, ...).
    pub slug: String,
    /// Human-readable name.
    pub name: String,
    /// Contacts one worker may hold before extra quota is granted.
    pub base_quota: u32,
    /// Position in listings.
    pub display_order: u32,
}

/// One allocatable contact as stored in the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub category: String,
    pub value: String,
    pub normalized_key: String,
    pub assigned_to: Option<WorkerId>,
    /// ISO 8601 timestamp, set together with `assigned_to`.
    pub assigned_at: Option<String>,
    pub is_active: bool,
}

/// A contact value ready for import, with its key already computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
    pub value: String,
    pub normalized_key: String,
}

/// Result of a bulk import into one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    /// Values offered after cleaning.
    pub submitted: usize,
    /// Rows actually inserted.
    pub inserted: usize,
    /// Values already present in the category (case-insensitive).
    pub skipped: usize,
}

/// Free and total contact counts of one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Unassigned, active contacts.
    pub free: u64,
    /// Every contact ever imported into the category.
    pub total: u64,
}

impl PoolStats {
    /// Free share of the pool in percent, `None` for an empty pool.
    pub fn free_percent(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some(self.free as f64 / self.total as f64 * 100.0)
    }

    /// True when a non-empty pool has less than `percent` percent free.
    pub fn is_below_low_water(&self, percent: f64) -> bool {
        self.free_percent().is_some_and(|p| p < percent)
    }
}

/// Terminal outcome of an allocation request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AllocationOutcome {
    /// Contacts were handed out.
    Ok,
    /// The worker already holds their full quota.
    AlreadyAtLimit,
    /// Fewer free contacts than the worker is entitled to.
    InsufficientSupply,
}

/// What a worker received from one allocation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub category: String,
    pub worker_id: WorkerId,
    pub outcome: AllocationOutcome,
    /// Raw values assigned by this request, in pool order. Empty unless `Ok`.
    pub values: Vec<String>,
    /// `base_quota + extra` at the time of the request.
    pub total_allowed: u32,
    /// Contacts the worker held in the category before this request.
    pub already_issued: u32,
    /// Pool counts after the request.
    pub stats: PoolStats,
}

/// Moderation status of a lead.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    Pending,
    Approved,
    Rejected,
    Rework,
}

impl LeadStatus {
    /// Whether a moderator may move a lead from `self` to `next`.
    ///
    /// Re-entering `Pending` happens only through resubmission, never here.
    pub fn can_moderate_to(self, next: LeadStatus) -> bool {
        matches!(
            (self, next),
            (
                LeadStatus::Pending,
                LeadStatus::Approved | LeadStatus::Rejected | LeadStatus::Rework
            )
        )
    }
}

/// A stored lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: i64,
    pub worker_id: WorkerId,
    /// Category slug, `None` when unknown.
    pub category: Option<String>,
    pub raw_contact: String,
    pub normalized_key: String,
    pub source: String,
    pub comment: String,
    pub status: LeadStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// Data a worker submits with a lead; the engine derives the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadPayload {
    pub worker_id: WorkerId,
    pub category: Option<String>,
    pub raw_contact: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub comment: String,
}

/// The lead that already owns a normalized key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadConflict {
    pub lead_id: i64,
    pub worker_id: WorkerId,
    pub category: Option<String>,
    pub status: LeadStatus,
}

/// Verdict of an atomic claim on a normalized key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ClaimResult {
    Accepted { lead_id: i64 },
    Duplicate(LeadConflict),
}

impl ClaimResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ClaimResult::Accepted { .. })
    }

    /// The existing owner when the claim was rejected.
    pub fn conflict(&self) -> Option<&LeadConflict> {
        match self {
            ClaimResult::Duplicate(conflict) => Some(conflict),
            ClaimResult::Accepted { .. } => None,
        }
    }
}
