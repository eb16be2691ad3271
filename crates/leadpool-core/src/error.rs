// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Leadpool engine.
//!
//! Quota exhaustion, supply exhaustion, duplicate leads, and "no category"
//! are normal outcomes and are returned as values, never through this type.

use thiserror::Error;

/// The primary error type used across all Leadpool traits and engine operations.
#[derive(Debug, Error)]
pub enum LeadpoolError {
    /// Configuration errors (invalid TOML, unknown keys, failed validation).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The storage layer could not take its lock in time. Safe to retry.
    #[error("storage contention: {message}")]
    Contention { message: String },

    /// A category slug that the store does not know about.
    #[error("unknown category `{0}`")]
    UnknownCategory(String),

    /// Contact text that normalizes to an empty key.
    #[error("not a valid contact: {0:?}")]
    InvalidContact(String),

    /// The same worker already has an allocation running for this category.
    #[error("allocation for worker {worker_id} in `{category}` is already being processed")]
    InFlight { worker_id: String, category: String },

    /// The in-flight request set is full.
    #[error("too many allocations in flight (capacity {capacity})")]
    Overloaded { capacity: usize },

    /// Lead id not present in the store (or not owned by the caller).
    #[error("lead {0} not found")]
    LeadNotFound(i64),

    /// A moderation status change that the lead lifecycle does not allow.
    #[error("lead status cannot change from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Caller passed an argument outside the accepted domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LeadpoolError {
    /// Whether the caller may retry the same operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LeadpoolError::Contention { .. })
    }
}
