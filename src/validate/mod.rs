//! Normalize-or-default checks for caller-supplied report parameters.
//!
//! Every function here is total: invalid input is replaced by a documented
//! default rather than rejected, so a report is always produced.

use crate::table::CountryTable;
use std::collections::HashSet;
use tracing::debug;

pub const DEFAULT_COUNTRY: &str = "CAN";
pub const DEFAULT_HISTORY: usize = 30;
pub const DEFAULT_TOP_N: usize = 5;

/// A normalized value plus whether the documented default was substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validated<T> {
    pub value: T,
    pub fell_back: bool,
}

impl<T> Validated<T> {
    fn ok(value: T) -> Self {
        Validated {
            value,
            fell_back: false,
        }
    }

    fn fallback(value: T) -> Self {
        Validated {
            value,
            fell_back: true,
        }
    }
}

/// Uppercase the requested codes, keep only those present in the metadata
/// key set, drop duplicates order-preserved. An empty result falls back to
/// `[DEFAULT_COUNTRY]`.
pub fn countries<S: AsRef<str>>(table: &CountryTable, input: &[S]) -> Validated<Vec<String>> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut codes: Vec<String> = Vec::new();

    for raw in input {
        let code = raw.as_ref().trim().to_uppercase();
        if table.contains(&code) && seen.insert(code.clone()) {
            codes.push(code);
        } else {
            debug!(code = %raw.as_ref(), "dropping unknown or duplicate country code");
        }
    }

    if codes.is_empty() {
        Validated::fallback(vec![DEFAULT_COUNTRY.to_string()])
    } else {
        Validated::ok(codes)
    }
}

/// Trailing-day count. `-1` means full history and maps to 0 (no trimming);
/// positive values pass through; everything else defaults to 30.
pub fn history(raw: i64) -> Validated<usize> {
    match raw {
        -1 => Validated::ok(0),
        n if n > 0 => Validated::ok(n as usize),
        _ => Validated::fallback(DEFAULT_HISTORY),
    }
}

/// String form of [`history`]; non-coercible input defaults to 30.
pub fn history_from_str(raw: &str) -> Validated<usize> {
    match raw.trim().parse::<i64>() {
        Ok(n) => history(n),
        Err(_) => Validated::fallback(DEFAULT_HISTORY),
    }
}

/// Ranking size, valid in `1..=country_count`; anything else defaults to 5.
pub fn top_n(raw: i64, country_count: usize) -> Validated<usize> {
    if raw > 0 && raw as usize <= country_count {
        Validated::ok(raw as usize)
    } else {
        Validated::fallback(DEFAULT_TOP_N)
    }
}

/// String form of [`top_n`]; non-coercible input defaults to 5.
pub fn top_n_from_str(raw: &str, country_count: usize) -> Validated<usize> {
    match raw.trim().parse::<i64>() {
        Ok(n) => top_n(n, country_count),
        Err(_) => Validated::fallback(DEFAULT_TOP_N),
    }
}
