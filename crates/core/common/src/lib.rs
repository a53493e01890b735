//! Common types shared by the symbol master crates

pub mod constants;
pub mod dates;
pub mod types;

pub use dates::{format_master_date, parse_master_date};
pub use types::{ParsePxError, Px};
