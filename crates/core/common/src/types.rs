//! Core value types

use crate::constants::{PX_DECIMALS, PX_SCALE};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Price type (stored as i64 ticks for determinism, 4 decimal places)
///
/// Strike prices, tick sizes and strike steps all live on this scale, so two
/// strikes compare equal exactly when their tick counts match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Px(i64); // Internal: price in ticks (1 tick = 0.0001)

impl Px {
    /// Create a new Price from f64 (converts to ticks)
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(value: f64) -> Self {
        Self((value * PX_SCALE as f64).round() as i64)
    }

    /// Get the price as f64
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / PX_SCALE as f64
    }

    /// Get price as i64 ticks
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }

    /// Create from i64 ticks
    #[must_use]
    pub const fn from_i64(ticks: i64) -> Self {
        Self(ticks)
    }

    /// Create from a whole number of price units
    #[must_use]
    pub const fn from_units(units: i64) -> Self {
        Self(units * PX_SCALE)
    }

    /// True for strictly positive prices
    #[must_use]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Absolute difference between two prices
    #[must_use]
    pub const fn abs_diff(self, other: Self) -> Self {
        Self((self.0 - other.0).abs())
    }

    /// Zero price
    pub const ZERO: Self = Self(0);
}

impl fmt::Display for Px {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let ticks = self.0.unsigned_abs();
        let scale = PX_SCALE.unsigned_abs();
        let whole = ticks / scale;
        let frac = ticks % scale;
        if frac == 0 {
            return write!(f, "{sign}{whole}");
        }
        let digits = format!("{frac:0width$}", width = PX_DECIMALS);
        write!(f, "{sign}{whole}.{}", digits.trim_end_matches('0'))
    }
}

/// Error returned when a decimal string cannot be represented as [`Px`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid price '{input}': {reason}")]
pub struct ParsePxError {
    /// Offending input
    pub input: String,
    /// What was wrong with it
    pub reason: &'static str,
}

impl FromStr for Px {
    type Err = ParsePxError;

    /// Parses a plain decimal (`65000`, `65000.00`, `0.05`, `-1`) without
    /// going through floating point.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| ParsePxError {
            input: s.to_string(),
            reason,
        };

        let trimmed = s.trim();
        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        if body.is_empty() {
            return Err(err("empty"));
        }

        let (whole, frac) = body.split_once('.').unwrap_or((body, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(err("no digits"));
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(err("not a decimal number"));
        }

        let significant = frac.trim_end_matches('0');
        if significant.len() > PX_DECIMALS {
            return Err(err("more than 4 decimal places"));
        }

        let whole_ticks = if whole.is_empty() {
            0
        } else {
            whole
                .parse::<i64>()
                .ok()
                .and_then(|w| w.checked_mul(PX_SCALE))
                .ok_or_else(|| err("out of range"))?
        };
        let frac_ticks = if significant.is_empty() {
            0
        } else {
            let padded = format!("{significant:0<width$}", width = PX_DECIMALS);
            padded.parse::<i64>().map_err(|_| err("not a decimal number"))?
        };

        let ticks = whole_ticks
            .checked_add(frac_ticks)
            .ok_or_else(|| err("out of range"))?;
        Ok(Self(if negative { -ticks } else { ticks }))
    }
}
