//! Validation Error Types

use thiserror::Error;

/// Problems found in participant input
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Value out of allowed range
    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// NaN or infinite numeric input
    #[error("{field} value is not a finite number")]
    NotFinite { field: &'static str },

    /// Label missing from the canonical category list
    #[error("{field} '{value}' is not a known category; it will be encoded as unknown")]
    UnknownCategory { field: &'static str, value: String },
}

impl ValidationError {
    /// Input field the error refers to
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::OutOfRange { field, .. }
            | ValidationError::NotFinite { field }
            | ValidationError::UnknownCategory { field, .. } => field,
        }
    }
}
