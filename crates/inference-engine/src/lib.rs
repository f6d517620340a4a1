//! Salary Inference Engine
//!
//! Loads the fitted feature scaler and regressor once, then runs
//! encode -> scale -> predict for each participant.

mod artifacts;
mod model;
mod onnx;
mod pipeline;
mod scaler;

pub use artifacts::{verify_feature_layout, ArtifactCache, ArtifactPaths, ModelArtifacts, ModelFormat};
pub use model::{GradientBoostingRegressor, RegressionTree, Regressor};
pub use onnx::OnnxRegressor;
pub use pipeline::{format_salary, PredictionPipeline, SalaryEstimate};
pub use scaler::{Scaler, StandardScaler};

use feature_engine::SchemaError;
use thiserror::Error;

/// Errors during artifact loading and inference
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Artifact not found: {0}")]
    ArtifactMissing(String),
    #[error("Invalid {artifact} artifact: {reason}")]
    ArtifactInvalid {
        artifact: &'static str,
        reason: String,
    },
    #[error("Category schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("Model load failed: {0}")]
    ModelLoadError(String),
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Invalid input shape: expected {expected} features, got {actual}")]
    InvalidInputShape { expected: usize, actual: usize },
    #[error("Feature schema mismatch: {0}")]
    SchemaMismatch(String),
}

impl InferenceError {
    /// Whether the error means the artifacts could not be made available
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            InferenceError::ArtifactMissing(_)
                | InferenceError::ArtifactInvalid { .. }
                | InferenceError::Schema(_)
                | InferenceError::ModelLoadError(_)
        )
    }
}
