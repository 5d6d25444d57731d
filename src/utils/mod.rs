// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 EssencialPay

//! Shared helper utilities reused by intake, compression and submission logic.

pub mod bytes;
pub mod sanitize_component;

/// Human-readable byte sizes and megabyte conversions.
pub use bytes::{format_bytes, mb_to_bytes};
/// Sanitize user-provided strings into upload-safe file name components.
pub use sanitize_component::sanitize_component;
