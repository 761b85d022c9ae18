// src/models/mod.rs

pub mod answer_key;
pub mod scoring_result;
pub mod settings;
pub mod statistics;

use std::sync::LazyLock;

use regex::Regex;

static SUBJECT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]{0,63}$").expect("subject pattern compiles"));

/// Subjects are lowercase snake_case identifiers such as `financial_accounting`.
pub fn validate_subject(subject: &str) -> Result<(), validator::ValidationError> {
    if SUBJECT_PATTERN.is_match(subject) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("invalid_subject"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_subject() {
        assert!(validate_subject("financial_accounting").is_ok());
        assert!(validate_subject("tax_law").is_ok());
        assert!(validate_subject("Tax Law").is_err());
        assert!(validate_subject("").is_err());
        assert!(validate_subject("1st").is_err());
    }
}
