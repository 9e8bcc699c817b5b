// Settings validation

use crate::{ConfigError, Result};

/// Trait for validating settings
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Reusable validation rules
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate that a value is not empty
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot be empty",
                field
            )));
        }
        Ok(())
    }

    /// Validate that a number is greater than zero
    pub fn positive(value: u64, field: &str) -> Result<()> {
        if value == 0 {
            return Err(ConfigError::ValidationError(format!(
                "{} must be greater than zero",
                field
            )));
        }
        Ok(())
    }

    /// Validate that a value is in a list of allowed values
    pub fn one_of(value: &str, allowed: &[&str], field: &str) -> Result<()> {
        if !allowed.contains(&value) {
            return Err(ConfigError::ValidationError(format!(
                "{} must be one of: {}",
                field,
                allowed.join(", ")
            )));
        }
        Ok(())
    }

    /// Validate that every entry of a list is non-empty
    pub fn no_empty_entries(values: &[String], field: &str) -> Result<()> {
        if values.iter().any(|v| v.trim().is_empty()) {
            return Err(ConfigError::ValidationError(format!(
                "{} contains an empty entry",
                field
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_empty_validation() {
        assert!(ConfigValidator::not_empty("value", "field").is_ok());
        assert!(ConfigValidator::not_empty("", "field").is_err());
        assert!(ConfigValidator::not_empty("   ", "field").is_err());
    }

    #[test]
    fn test_positive_validation() {
        assert!(ConfigValidator::positive(1, "field").is_ok());
        assert!(ConfigValidator::positive(0, "field").is_err());
    }

    #[test]
    fn test_one_of_validation() {
        let allowed = ["sandbox", "production"];
        assert!(ConfigValidator::one_of("sandbox", &allowed, "environment").is_ok());
        let err = ConfigValidator::one_of("staging", &allowed, "environment").unwrap_err();
        assert!(err.to_string().contains("sandbox, production"));
    }

    #[test]
    fn test_no_empty_entries() {
        let ok = vec!["localhost:9092".to_string()];
        let bad = vec!["localhost:9092".to_string(), "".to_string()];
        assert!(ConfigValidator::no_empty_entries(&ok, "brokers").is_ok());
        assert!(ConfigValidator::no_empty_entries(&bad, "brokers").is_err());
    }
}
