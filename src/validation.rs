//! Form validation shared by the create/update commands.

use chrono::NaiveDate;

use crate::error::{AppError, AppResult};

pub fn min_len(field: &str, value: &str, min: usize) -> AppResult<()> {
    if value.trim().chars().count() < min {
        return Err(AppError::validation(format!(
            "{} must have at least {} characters",
            field, min
        )));
    }
    Ok(())
}

pub fn non_negative(field: &str, value: f64) -> AppResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::validation(format!("{} must not be negative", field)));
    }
    Ok(())
}

pub fn positive(field: &str, value: f64) -> AppResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(AppError::validation(format!("{} must be greater than zero", field)));
    }
    Ok(())
}

/// Checks a `YYYY-MM-DD` date.
pub fn date(field: &str, value: &str) -> AppResult<()> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| AppError::validation(format!("{} must be a YYYY-MM-DD date", field)))
}

/// Trims an optional text field, mapping blank to `None`.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_len_counts_characters_not_bytes() {
        assert!(min_len("Nome", "Pã", 2).is_ok());
        assert!(min_len("Nome", " a ", 2).is_err());
    }

    #[test]
    fn test_numbers() {
        assert!(non_negative("Preço", 0.0).is_ok());
        assert!(non_negative("Preço", -0.5).is_err());
        assert!(non_negative("Preço", f64::NAN).is_err());
        assert!(positive("Valor", 0.0).is_err());
        assert!(positive("Valor", 10.0).is_ok());
    }

    #[test]
    fn test_dates_and_optional_text() {
        assert!(date("Data", "2024-02-29").is_ok());
        assert!(date("Data", "29/02/2024").is_err());
        assert_eq!(optional_text(Some("  ".into())), None);
        assert_eq!(optional_text(Some(" 500123 ".into())), Some("500123".into()));
    }
}
