// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure text functions over contact strings: normalization into identity
//! keys, extraction from free-form messages, platform conventions, and
//! keyword category hints.
//!
//! Nothing in this crate performs I/O or returns an error.

pub mod extract;
pub mod hints;
pub mod normalize;
pub mod platform;

pub use extract::{ContactExtractor, extract};
pub use hints::{CategoryHintPolicy, KeywordHints};
pub use normalize::{ContactNormalizer, TrunkRule, contact_url, normalize};
pub use platform::{Platform, url_for_key};
