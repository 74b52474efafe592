//! Configuration errors and validation.

use thiserror::Error;

/// Errors raised while validating configuration values.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A numeric field is outside its allowed range.
    #[error("invalid value for '{field}': expected {expected}, got {actual}")]
    InvalidValue {
        /// Dotted path of the offending field.
        field: String,
        /// Human readable description of the allowed values.
        expected: String,
        /// The rejected value.
        actual: String,
    },
    /// A source toggle names a detection source that was never registered.
    #[error("unknown detection source '{name}' in source toggles")]
    UnknownSource {
        /// The unknown source name.
        name: String,
    },
}

/// Implemented by every configuration struct that can be checked before use.
pub trait ConfigValidator {
    /// Returns the first invalid field, if any.
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Checks that `value` is finite and lies within `[min, max]`.
pub fn validate_range<T>(field: &str, value: T, min: T, max: T) -> Result<(), ConfigError>
where
    T: Into<f64> + Copy + std::fmt::Display,
{
    let v: f64 = value.into();
    if !v.is_finite() || v < min.into() || v > max.into() {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            expected: format!("a value in [{min}, {max}]"),
            actual: value.to_string(),
        });
    }
    Ok(())
}

/// Checks that `value` is finite and strictly greater than zero.
pub fn validate_positive<T>(field: &str, value: T) -> Result<(), ConfigError>
where
    T: Into<f64> + Copy + std::fmt::Display,
{
    let v: f64 = value.into();
    if !v.is_finite() || v <= 0.0 {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            expected: "a finite value > 0".to_string(),
            actual: value.to_string(),
        });
    }
    Ok(())
}

/// Checks that `value` is finite and not negative.
pub fn validate_non_negative<T>(field: &str, value: T) -> Result<(), ConfigError>
where
    T: Into<f64> + Copy + std::fmt::Display,
{
    let v: f64 = value.into();
    if !v.is_finite() || v < 0.0 {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            expected: "a finite value >= 0".to_string(),
            actual: value.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_range() {
        assert!(validate_range("iou", 0.5f32, 0.0, 1.0).is_ok());
        assert!(validate_range("iou", 1.0f32, 0.0, 1.0).is_ok());
        assert!(validate_range("iou", 1.01f32, 0.0, 1.0).is_err());
        assert!(validate_range("iou", f32::NAN, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_validate_positive_rejects_zero() {
        let err = validate_positive("c", 0.0f64).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "c"));
        assert!(validate_positive("c", f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_non_negative() {
        assert!(validate_non_negative("min_dimension", 0.0f32).is_ok());
        assert!(validate_non_negative("min_dimension", -1.0f32).is_err());
    }
}
