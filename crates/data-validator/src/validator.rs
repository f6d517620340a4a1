//! Data Validator for Range and Category Checking

use crate::error::ValidationError;
use feature_engine::{CategorySchema, ParticipantInput};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Validation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Reject requests with findings instead of reporting them as warnings
    pub strict: bool,
    /// Age valid range (years)
    pub age_range: (f64, f64),
    /// Training duration valid range (hours)
    pub duration_range: (f64, f64),
    /// Exam score valid range
    pub exam_score_range: (f64, f64),
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            strict: false,
            age_range: (18.0, 60.0),
            duration_range: (20.0, 1000.0),
            exam_score_range: (50.0, 100.0),
        }
    }
}

/// Result of validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// Whether all values are valid
    pub valid: bool,
    /// List of validation errors
    pub errors: Vec<ValidationError>,
    /// Number of fields validated
    pub fields_checked: usize,
}

impl ValidationResult {
    fn from_errors(errors: Vec<ValidationError>, fields_checked: usize) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            fields_checked,
        }
    }

    /// Human-readable messages, one per finding
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

/// Validator for participant form input
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate a single value against a range
    pub fn validate_range(
        &self,
        field: &'static str,
        value: f64,
        range: (f64, f64),
    ) -> Result<(), ValidationError> {
        if !value.is_finite() {
            Err(ValidationError::NotFinite { field })
        } else if value < range.0 || value > range.1 {
            Err(ValidationError::OutOfRange {
                field,
                value,
                min: range.0,
                max: range.1,
            })
        } else {
            Ok(())
        }
    }

    pub fn validate_age(&self, age: u32) -> Result<(), ValidationError> {
        self.validate_range("age", age as f64, self.config.age_range)
    }

    pub fn validate_duration(&self, hours: f64) -> Result<(), ValidationError> {
        self.validate_range("training_duration_hours", hours, self.config.duration_range)
    }

    pub fn validate_exam_score(&self, score: f64) -> Result<(), ValidationError> {
        self.validate_range("exam_score", score, self.config.exam_score_range)
    }

    /// Check every field of `input`, collecting all findings
    pub fn validate(&self, input: &ParticipantInput, schema: &CategorySchema) -> ValidationResult {
        let mut errors = Vec::new();

        for check in [
            self.validate_age(input.age),
            self.validate_duration(input.training_duration_hours),
            self.validate_exam_score(input.exam_score),
        ] {
            if let Err(e) = check {
                errors.push(e);
            }
        }

        let categories = [
            (
                "education_level",
                &input.education_level,
                schema.education_levels.contains(&input.education_level),
            ),
            ("major", &input.major, schema.majors.contains(&input.major)),
            ("gender", &input.gender, schema.gender.contains(&input.gender)),
            (
                "employment_status",
                &input.employment_status,
                schema.employment_status.contains(&input.employment_status),
            ),
        ];
        for (field, value, known) in categories {
            if !known {
                errors.push(ValidationError::UnknownCategory {
                    field,
                    value: value.clone(),
                });
            }
        }

        if !errors.is_empty() {
            debug!("Input validation found {} issue(s)", errors.len());
        }
        ValidationResult::from_errors(errors, 7)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}
