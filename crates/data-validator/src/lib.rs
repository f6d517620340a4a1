//! Participant Input Validation
//!
//! Range and category checks for form input. Findings are reported, never
//! applied: the encoder still sees the input unchanged.

mod error;
mod validator;

pub use error::ValidationError;
pub use validator::{ValidationConfig, ValidationResult, Validator};
