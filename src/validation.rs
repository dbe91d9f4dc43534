//! Schema checks applied to task input before it reaches the repository.

use crate::error::ValidationError;
use crate::types::{TaskData, TaskPatch};
use chrono::NaiveDate;
use regex_lite::Regex;
use std::sync::OnceLock;

pub const TITLE_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 500;

/// Format used for due dates everywhere.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("static regex"))
}

/// Parse a `YYYY-MM-DD` due date.
pub fn parse_due_date(value: &str) -> Result<NaiveDate, ValidationError> {
    if !date_pattern().is_match(value) {
        return Err(ValidationError::new(
            "dueDate",
            "Due date must be in YYYY-MM-DD format",
        ));
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| ValidationError::new("dueDate", format!("{} is not a calendar date", value)))
}

pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::new("title", "Title is required"));
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(ValidationError::new(
            "title",
            format!("Title must be {} characters or less", TITLE_MAX_CHARS),
        ));
    }
    Ok(())
}

pub fn validate_description(description: &str) -> Result<(), ValidationError> {
    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        return Err(ValidationError::new(
            "description",
            format!(
                "Description must be {} characters or less",
                DESCRIPTION_MAX_CHARS
            ),
        ));
    }
    Ok(())
}

impl TaskData {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)?;
        if let Some(ref description) = self.description {
            validate_description(description)?;
        }
        parse_due_date(&self.due_date)?;
        Ok(())
    }
}

impl TaskPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(ref title) = self.title {
            validate_title(title)?;
        }
        if let Some(ref description) = self.description {
            validate_description(description)?;
        }
        if let Some(ref due_date) = self.due_date {
            parse_due_date(due_date)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_data_passes() {
        let data = TaskData::new("Buy milk", "2026-01-15").with_description("2 litres");
        assert!(data.validate().is_ok());
    }

    #[test]
    fn test_empty_title_rejected() {
        let err = TaskData::new("   ", "2026-01-15").validate().unwrap_err();
        assert_eq!(err.field, "title");
        assert_eq!(err.message, "Title is required");
    }

    #[test]
    fn test_title_limit_counts_characters_not_bytes() {
        let ok = "é".repeat(TITLE_MAX_CHARS);
        assert!(TaskData::new(ok, "2026-01-15").validate().is_ok());

        let too_long = "a".repeat(TITLE_MAX_CHARS + 1);
        let err = TaskData::new(too_long, "2026-01-15").validate().unwrap_err();
        assert_eq!(err.field, "title");
    }

    #[test]
    fn test_description_limit() {
        let data = TaskData::new("t", "2026-01-15").with_description("x".repeat(501));
        assert_eq!(data.validate().unwrap_err().field, "description");
    }

    #[test]
    fn test_due_date_format() {
        for bad in ["2026-1-15", "15-01-2026", "2026/01/15", "2026-01-15T00:00", ""] {
            let err = parse_due_date(bad).unwrap_err();
            assert_eq!(err.field, "dueDate", "{bad} should be rejected");
        }
        assert!(parse_due_date("2026-02-30").is_err());
        assert_eq!(
            parse_due_date("2026-01-15").unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
        );
    }

    #[test]
    fn test_patch_only_checks_present_fields() {
        assert!(TaskPatch::default().validate().is_ok());
        assert!(TaskPatch::completed(true).validate().is_ok());
        assert_eq!(
            TaskPatch::title("").validate().unwrap_err().field,
            "title"
        );
        assert_eq!(
            TaskPatch::due_date("tomorrow").validate().unwrap_err().field,
            "dueDate"
        );
    }
}
