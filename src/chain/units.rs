// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Minor/major unit conversion for STX.
//!
//! Balances arrive from the indexer in micro-STX as decimal strings; listing
//! prices are STX decimal strings.

/// Micro-STX per STX.
pub const MICRO_STX_PER_STX: u64 = 1_000_000;

/// Convert an STX amount to micro-STX, rounding to the nearest unit.
///
/// Negative, non-finite, or out-of-range amounts yield `None`.
pub fn stx_to_micro(stx: f64) -> Option<u64> {
    if !stx.is_finite() || stx < 0.0 {
        return None;
    }
    let micro = (stx * MICRO_STX_PER_STX as f64).round();
    if micro > u64::MAX as f64 {
        return None;
    }
    Some(micro as u64)
}

/// Format micro-STX as an STX string with up to six decimals.
pub fn format_stx(micro: u128) -> String {
    let divisor = MICRO_STX_PER_STX as u128;
    let whole = micro / divisor;
    let remainder = micro % divisor;

    if remainder == 0 {
        return whole.to_string();
    }

    let decimal_str = format!("{remainder:0>6}");
    format!("{whole}.{}", decimal_str.trim_end_matches('0'))
}
