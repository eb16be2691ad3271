// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classification, atomic allocation, and lead deduplication on top of a
//! [`ContactStore`](leadpool_core::ContactStore).
//!
//! [`LeadEngine`] is the entry point. The pieces it composes are public for
//! callers that need only one of them.

pub mod allocator;
pub mod classifier;
pub mod dedup;
pub mod engine;
pub mod import;
pub mod inflight;
pub mod retry;

pub use allocator::Allocator;
pub use classifier::Classifier;
pub use dedup::LeadIndex;
pub use engine::{LeadEngine, categories_from_config};
pub use inflight::{InFlightGuard, InFlightSet};
pub use retry::RetryPolicy;
