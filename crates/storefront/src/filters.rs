//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Keeps only the digits of a phone number, for `tel:` links.
///
/// Usage in templates: `{{ contact.phone|phone_digits }}`
#[askama::filter_fn]
pub fn phone_digits(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(value
        .to_string()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect())
}
