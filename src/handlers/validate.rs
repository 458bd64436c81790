//! Input checks shared by handlers. Each returns a 400 `ApiError` on failure.

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::auth::password::MIN_PASSWORD_LENGTH;
use crate::database::Page;
use crate::error::ApiError;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

/// Trimmed, non-empty text
pub fn filled(value: &Option<String>) -> bool {
    value.as_deref().map(|v| !v.trim().is_empty()).unwrap_or(false)
}

/// `fields` pairs a field name with whether it was supplied
pub fn require_fields(fields: &[(&str, bool)]) -> Result<(), ApiError> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, present)| !present)
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!(
            "Please provide all required fields: {}",
            missing.join(", ")
        )))
    }
}

/// Trimmed value of a field already checked by `require_fields`
pub fn text(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

/// Trimmed value, with blank treated as absent
pub fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub fn email(value: &str) -> Result<(), ApiError> {
    if EMAIL_PATTERN.is_match(value.trim()) {
        Ok(())
    } else {
        Err(ApiError::bad_request("Please provide a valid email address"))
    }
}

pub fn password(value: &str) -> Result<(), ApiError> {
    if value.chars().count() >= MIN_PASSWORD_LENGTH {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )))
    }
}

pub fn range(field: &str, value: i32, min: i32, max: i32) -> Result<(), ApiError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!("{} must be between {} and {}", field, min, max)))
    }
}

pub fn future_date(field: &str, value: NaiveDate, today: NaiveDate) -> Result<(), ApiError> {
    if value > today {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!("{} must be in the future", field)))
    }
}

pub fn future_instant(field: &str, value: DateTime<Utc>) -> Result<(), ApiError> {
    if value > Utc::now() {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!("{} must be in the future", field)))
    }
}

/// `?page=&limit=` on listing endpoints
#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl Pagination {
    pub fn page(&self, max_limit: i64) -> Page {
        Page::new(self.page, self.limit, max_limit)
    }
}
