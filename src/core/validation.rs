//! Field-level request checks.
//!
//! Requests derive [`Validate`]; every rule runs and every violation is
//! reported. The helpers here cover the rules the derive cannot express on
//! its own.

use rust_decimal::Decimal;
use std::borrow::Cow;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::AppError;

pub const HISTORY_DAYS: [i32; 3] = [30, 90, 365];

pub fn validate_positive_amount(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_positive() && !value.is_zero() {
        return Ok(());
    }
    Err(ValidationError::new("positive")
        .with_message(Cow::Borrowed("dailyBudget must be greater than 0.")))
}

fn is_ascii_letters(code: &str) -> bool {
    code.chars().all(|c| c.is_ascii_alphabetic())
}

/// Presence and alphabet of a currency code. Length is a separate rule on
/// the field so both violations can be reported.
pub fn validate_currency_code(code: &str) -> Result<(), ValidationError> {
    if code.is_empty() {
        return Err(ValidationError::new("required"));
    }
    if !is_ascii_letters(code) {
        return Err(ValidationError::new("letters"));
    }
    Ok(())
}

pub fn validate_country_codes(codes: &[String]) -> Result<(), ValidationError> {
    let invalid: Vec<&str> = codes
        .iter()
        .filter(|code| code.chars().count() != 2 || !is_ascii_letters(code))
        .map(String::as_str)
        .collect();
    if invalid.is_empty() {
        return Ok(());
    }
    Err(ValidationError::new("country_code").with_message(Cow::Owned(format!(
        "Each destination country must be a 2-character ISO country code (got: {}).",
        invalid.join(", ")
    ))))
}

pub fn validate_history_days(days: i32) -> Result<(), ValidationError> {
    if HISTORY_DAYS.contains(&days) {
        return Ok(());
    }
    Err(ValidationError::new("history_days")
        .with_message(Cow::Borrowed("days must be 30, 90, or 365.")))
}

/// Runs all rules on `request` and folds the violations into one error.
pub fn validate_request<T: Validate>(request: &T) -> Result<(), AppError> {
    request
        .validate()
        .map_err(|errors| AppError::Validation(messages(&errors)))
}

/// One message per violation, ordered by field name so responses are stable.
fn messages(errors: &ValidationErrors) -> Vec<String> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|(a, _), (b, _)| a.cmp(b));

    fields
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| match &error.message {
                Some(message) => message.to_string(),
                None => default_message(&camel_case(&field), &error.code),
            })
        })
        .collect()
}

fn default_message(field: &str, code: &str) -> String {
    match code {
        "required" => format!("{field} is required."),
        "letters" => format!("{field} must contain only the letters A-Z."),
        _ => format!("{field} is invalid ({code})."),
    }
}

/// Request fields are reported under their wire names.
fn camel_case(field: &str) -> String {
    let mut parts = field.split('_');
    let mut name = parts.next().unwrap_or_default().to_string();
    for part in parts {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            name.extend(first.to_uppercase());
            name.push_str(chars.as_str());
        }
    }
    name
}
