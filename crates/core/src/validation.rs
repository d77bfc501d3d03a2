//! Input validation utilities.
//!
//! This module contains the normalisation rules applied to free-text form input before it is
//! stored on a treatment record, plus the admission-date check shared by the intake stage and
//! the create operation.

use crate::{RecordError, RecordResult};
use chrono::NaiveDate;

/// Splits a comma-separated field into an ordered list of trimmed entries.
///
/// Empty entries (from blank input, doubled commas or a trailing comma) are dropped, so
/// `"A, B,C "` becomes `["A", "B", "C"]`.
pub fn split_comma_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Normalises a free-text field into a single-element list, or an empty list when blank.
pub fn single_entry(input: &str) -> Vec<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        Vec::new()
    } else {
        vec![trimmed.to_owned()]
    }
}

/// Rejects admission dates strictly after `today`.
pub fn ensure_admission_not_in_future(date: NaiveDate, today: NaiveDate) -> RecordResult<()> {
    if date > today {
        return Err(RecordError::FutureAdmissionDate);
    }
    Ok(())
}

/// Parses a `YYYY-MM-DD` admission date as entered on the intake form.
pub fn parse_admission_date(input: &str) -> RecordResult<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|e| {
        RecordError::InvalidInput(format!(
            "admission date must be YYYY-MM-DD, got '{}': {}",
            input.trim(),
            e
        ))
    })
}

/// Returns true if every entry of `list` is blank (or the list is empty).
pub(crate) fn is_blank_list(list: &[String]) -> bool {
    list.iter().all(|item| item.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_comma_list_trims_and_preserves_order() {
        assert_eq!(split_comma_list("A, B,C "), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_split_comma_list_drops_empty_artifacts() {
        assert_eq!(split_comma_list("Paracetamol,"), vec!["Paracetamol"]);
        assert_eq!(split_comma_list(", ,A,,B ,"), vec!["A", "B"]);
        assert!(split_comma_list("").is_empty());
        assert!(split_comma_list("  ,  ").is_empty());
    }

    #[test]
    fn test_single_entry_wraps_text() {
        assert_eq!(single_entry("  none "), vec!["none"]);
        assert!(single_entry("   ").is_empty());
    }

    #[test]
    fn test_admission_date_boundary() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2024, 5, 9).unwrap();
        let tomorrow = NaiveDate::from_ymd_opt(2024, 5, 11).unwrap();

        assert!(ensure_admission_not_in_future(yesterday, today).is_ok());
        assert!(ensure_admission_not_in_future(today, today).is_ok());
        assert!(matches!(
            ensure_admission_not_in_future(tomorrow, today),
            Err(RecordError::FutureAdmissionDate)
        ));
    }

    #[test]
    fn test_parse_admission_date() {
        assert_eq!(
            parse_admission_date(" 2024-01-31 ").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()
        );
        assert!(matches!(
            parse_admission_date("31/01/2024"),
            Err(RecordError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_is_blank_list() {
        assert!(is_blank_list(&[]));
        assert!(is_blank_list(&["  ".to_string()]));
        assert!(!is_blank_list(&["x".to_string()]));
    }
}
