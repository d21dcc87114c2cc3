use chrono::NaiveDate;

use crate::server::response::ApiError;

const MAX_NAME_LEN: usize = 100;
const MAX_BATCH_LEN: usize = 64;
const MAX_SUBJECT_LEN: usize = 64;
const MAX_TOPIC_LEN: usize = 500;

fn validate_text(value: &str, entity: &str, max_len: usize) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::bad_request(format!("{entity} cannot be empty")));
    }
    if value.len() > max_len {
        return Err(ApiError::bad_request(format!(
            "{entity} cannot exceed {max_len} characters"
        )));
    }
    Ok(())
}

pub fn validate_student_name(name: &str) -> Result<(), ApiError> {
    validate_text(name, "Student name", MAX_NAME_LEN)
}

pub fn validate_batch(batch: &str) -> Result<(), ApiError> {
    if batch.len() > MAX_BATCH_LEN {
        return Err(ApiError::bad_request(format!(
            "Batch cannot exceed {MAX_BATCH_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_subject_name(name: &str) -> Result<(), ApiError> {
    validate_text(name, "Subject", MAX_SUBJECT_LEN)
}

pub fn validate_topic(topic: &str) -> Result<(), ApiError> {
    validate_text(topic, "Topic", MAX_TOPIC_LEN)
}

pub fn validate_display_name(name: &str) -> Result<(), ApiError> {
    validate_text(name, "Display name", MAX_NAME_LEN)
}

/// Lesson dates travel as ISO `YYYY-MM-DD` strings.
pub fn validate_lesson_date(date: &str) -> Result<(), ApiError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| ApiError::bad_request("Lesson date must be in YYYY-MM-DD format"))
}

pub fn validate_target_classes(target: i64) -> Result<(), ApiError> {
    if target < 0 {
        return Err(ApiError::bad_request("Target classes cannot be negative"));
    }
    Ok(())
}

pub fn validate_class_serial(serial: i64) -> Result<(), ApiError> {
    if serial < 1 {
        return Err(ApiError::bad_request("Class serial must be positive"));
    }
    Ok(())
}

pub fn validate_month(month: u32) -> Result<(), ApiError> {
    if !(1..=12).contains(&month) {
        return Err(ApiError::bad_request("Month must be between 1 and 12"));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ApiError> {
    if email.trim().is_empty() || !email.contains('@') {
        return Err(ApiError::bad_request("A valid email address is required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_name_rejected() {
        assert!(validate_student_name("").is_err());
        assert!(validate_student_name("   ").is_err());
        assert!(validate_student_name("Asha Rahman").is_ok());
    }

    #[test]
    fn test_lesson_date_format() {
        assert!(validate_lesson_date("2026-08-23").is_ok());
        assert!(validate_lesson_date("23/08/2026").is_err());
        assert!(validate_lesson_date("2026-13-01").is_err());
        assert!(validate_lesson_date("").is_err());
    }

    #[test]
    fn test_month_bounds() {
        assert!(validate_month(1).is_ok());
        assert!(validate_month(12).is_ok());
        assert!(validate_month(0).is_err());
        assert!(validate_month(13).is_err());
    }

    #[test]
    fn test_class_serial_positive() {
        assert!(validate_class_serial(1).is_ok());
        assert!(validate_class_serial(0).is_err());
        assert!(validate_class_serial(-3).is_err());
    }
}
