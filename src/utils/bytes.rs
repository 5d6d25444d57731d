// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 EssencialPay

//! Byte size helpers shared by compression logging and upload limits.

const MIB: f64 = 1024.0 * 1024.0;

/// Convert a size budget expressed in (binary) megabytes into bytes.
///
/// Negative or NaN budgets collapse to zero.
pub fn mb_to_bytes(mb: f64) -> u64 {
    if mb.is_nan() || mb <= 0.0 {
        return 0;
    }
    (mb * MIB).floor() as u64
}

/// Human-readable formatting for byte sizes with binary units.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}
