//! Feature Scaling

use crate::artifacts::read_artifact;
use crate::InferenceError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// A fitted per-column transform applied before the regressor
pub trait Scaler: Send + Sync {
    /// Number of columns the scaler was fitted on
    fn n_features(&self) -> usize;

    /// Column names seen at fit time, when the artifact recorded them
    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    /// Transform one row
    fn transform(&self, row: &[f64]) -> Result<Vec<f64>, InferenceError>;

    /// Transform several rows
    fn transform_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, InferenceError> {
        rows.iter().map(|row| self.transform(row)).collect()
    }
}

/// Standardization with frozen training statistics: `(x - mean) / scale`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    feature_names: Option<Vec<String>>,
}

impl StandardScaler {
    /// Build a scaler from fitted statistics
    pub fn new(
        mean: Vec<f64>,
        scale: Vec<f64>,
        feature_names: Option<Vec<String>>,
    ) -> Result<Self, InferenceError> {
        let mut scaler = Self {
            mean,
            scale,
            feature_names,
        };
        scaler.check()?;
        // Constant columns were fitted with zero variance
        for s in scaler.scale.iter_mut() {
            if *s == 0.0 {
                *s = 1.0;
            }
        }
        Ok(scaler)
    }

    /// Parse a scaler artifact
    pub fn from_json(text: &str) -> Result<Self, InferenceError> {
        let raw: Self = serde_json::from_str(text).map_err(|e| InferenceError::ArtifactInvalid {
            artifact: "scaler",
            reason: e.to_string(),
        })?;
        Self::new(raw.mean, raw.scale, raw.feature_names)
    }

    /// Load a scaler artifact file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InferenceError> {
        let path = path.as_ref();
        let scaler = Self::from_json(&read_artifact(path)?)?;
        debug!("Loaded scaler from {} ({} features)", path.display(), scaler.mean.len());
        Ok(scaler)
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    fn check(&self) -> Result<(), InferenceError> {
        let invalid = |reason: String| InferenceError::ArtifactInvalid {
            artifact: "scaler",
            reason,
        };
        if self.mean.is_empty() {
            return Err(invalid("no columns".to_string()));
        }
        if self.mean.len() != self.scale.len() {
            return Err(invalid(format!(
                "mean has {} columns but scale has {}",
                self.mean.len(),
                self.scale.len()
            )));
        }
        if let Some(names) = &self.feature_names {
            if names.len() != self.mean.len() {
                return Err(invalid(format!(
                    "{} feature names for {} columns",
                    names.len(),
                    self.mean.len()
                )));
            }
        }
        if self
            .mean
            .iter()
            .chain(self.scale.iter())
            .any(|v| !v.is_finite())
        {
            return Err(invalid("non-finite statistic".to_string()));
        }
        Ok(())
    }
}

impl Scaler for StandardScaler {
    fn n_features(&self) -> usize {
        self.mean.len()
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn transform(&self, row: &[f64]) -> Result<Vec<f64>, InferenceError> {
        if row.len() != self.mean.len() {
            return Err(InferenceError::InvalidInputShape {
                expected: self.mean.len(),
                actual: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
            .map(|(x, (mean, scale))| (x - mean) / scale)
            .collect())
    }
}
