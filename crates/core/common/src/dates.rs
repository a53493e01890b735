//! Date helpers for the symbol master `DD-MON-YYYY` layout

use crate::constants::{ISO_DATE_FORMAT, MASTER_DATE_FORMAT};
use chrono::NaiveDate;

/// Parse a master-file date (`06-NOV-2023`, month name case-insensitive).
///
/// ISO dates (`2023-11-06`) are accepted as well so callers can pass either.
pub fn parse_master_date(input: &str) -> Result<NaiveDate, chrono::ParseError> {
    let trimmed = input.trim();
    NaiveDate::parse_from_str(trimmed, MASTER_DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(trimmed, ISO_DATE_FORMAT))
}

/// Format a date the way the master file writes it: `06-NOV-2023`
#[must_use]
pub fn format_master_date(date: NaiveDate) -> String {
    date.format(MASTER_DATE_FORMAT).to_string().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_master_layout_any_case() {
        assert_eq!(parse_master_date("06-NOV-2023").unwrap(), ymd(2023, 11, 6));
        assert_eq!(parse_master_date("06-Nov-2023").unwrap(), ymd(2023, 11, 6));
        assert_eq!(parse_master_date(" 16-nov-2023 ").unwrap(), ymd(2023, 11, 16));
    }

    #[test]
    fn test_parse_iso_fallback() {
        assert_eq!(parse_master_date("2023-11-23").unwrap(), ymd(2023, 11, 23));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_master_date("").is_err());
        assert!(parse_master_date("31-FEB-2023").is_err());
        assert!(parse_master_date("NOV-06-2023").is_err());
    }

    #[test]
    fn test_format_is_uppercase() {
        assert_eq!(format_master_date(ymd(2023, 11, 9)), "09-NOV-2023");
    }
}
