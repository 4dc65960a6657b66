//! Validation system for configuration values
//!
//! Each config section implements the `ConfigSection` trait which includes validation.

pub use crate::error::ValidationError;

/// Trait for configuration sections that can validate themselves
pub trait ConfigSection: Default {
    /// Validates the configuration section
    fn validate(&self) -> Result<(), Vec<ValidationError>>;

    /// Merges another config section into this one
    ///
    /// Values from `other` take precedence.
    fn merge(&mut self, other: Self);

    /// Returns the section name for error reporting
    fn section_name(&self) -> &'static str;
}

/// Common validators for config values
pub struct Validator;

impl Validator {
    /// Validates that a numeric value is within a range
    pub fn in_range<T>(value: T, min: T, max: T, field: &str) -> Result<(), ValidationError>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            Err(ValidationError::with_value(
                field,
                format!("must be between {} and {}", min, max),
                value,
            ))
        } else {
            Ok(())
        }
    }

    /// Validates that a string is not empty
    pub fn not_empty(value: &str, field: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            Err(ValidationError::new(field, "must not be empty"))
        } else {
            Ok(())
        }
    }

    /// Validates that a string contains only characters safe for ids and file names
    pub fn identifier(value: &str, field: &str) -> Result<(), ValidationError> {
        Self::not_empty(value, field)?;
        if value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            Ok(())
        } else {
            Err(ValidationError::with_value(
                field,
                "may only contain letters, digits, '-' and '_'",
                value,
            ))
        }
    }

    /// Collects multiple validation results into a single result
    pub fn collect_errors(
        results: Vec<Result<(), ValidationError>>,
    ) -> Result<(), Vec<ValidationError>> {
        let errors: Vec<ValidationError> = results.into_iter().filter_map(|r| r.err()).collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_range() {
        assert!(Validator::in_range(50, 0, 100, "test").is_ok());
        assert!(Validator::in_range(0, 0, 100, "test").is_ok());
        assert!(Validator::in_range(101, 0, 100, "test").is_err());
    }

    #[test]
    fn test_not_empty() {
        assert!(Validator::not_empty("ios", "test").is_ok());
        assert!(Validator::not_empty("   ", "test").is_err());
    }

    #[test]
    fn test_identifier() {
        assert!(Validator::identifier("user_42-a", "test").is_ok());
        assert!(Validator::identifier("../etc", "test").is_err());
        assert!(Validator::identifier("", "test").is_err());
    }

    #[test]
    fn test_collect_errors_some_err() {
        let results = vec![
            Ok(()),
            Err(ValidationError::new("field1", "error1")),
            Err(ValidationError::new("field2", "error2")),
        ];
        assert_eq!(Validator::collect_errors(results).unwrap_err().len(), 2);
    }
}
