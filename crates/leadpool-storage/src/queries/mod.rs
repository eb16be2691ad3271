// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the contact pool, quotas, and leads.

pub mod categories;
pub mod contacts;
pub mod leads;
pub mod quotas;
