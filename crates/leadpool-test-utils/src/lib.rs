// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Leadpool integration tests.
//!
//! # Components
//!
//! - [`TestHarness`] - engine over a temp SQLite database with seeded categories and contacts
//! - [`ContendedStore`] - store wrapper that injects lock contention

pub mod harness;
pub mod mock_store;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_store::ContendedStore;
