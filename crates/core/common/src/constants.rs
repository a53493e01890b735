//! Shared constants

/// Fixed-point scale for [`crate::Px`] (4 decimal places)
pub const PX_SCALE: i64 = 10_000;

/// Number of decimal places carried by [`crate::Px`]
pub const PX_DECIMALS: usize = 4;

/// Date layout used by exchange symbol master files, e.g. `06-NOV-2023`
pub const MASTER_DATE_FORMAT: &str = "%d-%b-%Y";

/// ISO date layout accepted from callers
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";
