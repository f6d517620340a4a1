//! Gradient Boosted Regression Trees

use crate::artifacts::read_artifact;
use crate::InferenceError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// A fitted regressor producing one scalar per scaled row
pub trait Regressor: Send + Sync {
    /// Number of columns the regressor expects
    fn n_features(&self) -> usize;

    /// Predict a single row
    fn predict(&self, row: &[f64]) -> Result<f64, InferenceError>;

    /// Predict several rows
    fn predict_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, InferenceError> {
        rows.iter().map(|row| self.predict(row)).collect()
    }
}

/// One regression tree in flat-array form.
///
/// Node `i` is a leaf when `children_left[i] == -1`; otherwise the row goes
/// left when `row[feature[i]] <= threshold[i]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    children_left: Vec<i64>,
    children_right: Vec<i64>,
    feature: Vec<i64>,
    threshold: Vec<f64>,
    value: Vec<f64>,
}

impl RegressionTree {
    /// Build a tree from its flat arrays. Split features are checked
    /// against the ensemble width in [`GradientBoostingRegressor::new`].
    pub fn new(
        children_left: Vec<i64>,
        children_right: Vec<i64>,
        feature: Vec<i64>,
        threshold: Vec<f64>,
        value: Vec<f64>,
    ) -> Self {
        Self {
            children_left,
            children_right,
            feature,
            threshold,
            value,
        }
    }

    /// Walk the tree for `row`
    pub fn evaluate(&self, row: &[f64]) -> Result<f64, InferenceError> {
        let broken = |node: usize| {
            InferenceError::InferenceFailed(format!("tree walk left the tree or the row at node {}", node))
        };
        let mut node = 0usize;
        // Each step moves to a strictly larger index in a checked tree
        for _ in 0..=self.value.len() {
            let left = *self.children_left.get(node).ok_or_else(|| broken(node))?;
            if left < 0 {
                return self.value.get(node).copied().ok_or_else(|| broken(node));
            }
            let x = usize::try_from(self.feature.get(node).copied().unwrap_or(-1))
                .ok()
                .and_then(|f| row.get(f))
                .ok_or_else(|| broken(node))?;
            let threshold = *self.threshold.get(node).ok_or_else(|| broken(node))?;
            let next = if *x <= threshold {
                left
            } else {
                *self.children_right.get(node).ok_or_else(|| broken(node))?
            };
            node = usize::try_from(next).map_err(|_| broken(node))?;
        }
        Err(broken(node))
    }

    fn check(&self, n_features: usize) -> Result<(), String> {
        let n = self.value.len();
        if n == 0 {
            return Err("tree has no nodes".to_string());
        }
        if [
            self.children_left.len(),
            self.children_right.len(),
            self.feature.len(),
            self.threshold.len(),
        ]
        .iter()
        .any(|&len| len != n)
        {
            return Err("tree arrays differ in length".to_string());
        }

        for node in 0..n {
            let (left, right) = (self.children_left[node], self.children_right[node]);
            if left < 0 {
                continue;
            }
            // Children are stored after their parent, so every walk terminates
            for child in [left, right] {
                if child <= node as i64 || child >= n as i64 {
                    return Err(format!("node {} has invalid child {}", node, child));
                }
            }
            let feature = self.feature[node];
            if feature < 0 || feature >= n_features as i64 {
                return Err(format!("node {} splits on unknown feature {}", node, feature));
            }
        }
        Ok(())
    }
}

/// Boosted ensemble: `init + learning_rate * sum(tree(row))`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    /// Baseline prediction before any tree
    init: f64,
    learning_rate: f64,
    n_features: usize,
    trees: Vec<RegressionTree>,
}

impl GradientBoostingRegressor {
    /// Build an ensemble, rejecting trees that cannot be walked safely
    pub fn new(
        init: f64,
        learning_rate: f64,
        n_features: usize,
        trees: Vec<RegressionTree>,
    ) -> Result<Self, InferenceError> {
        let model = Self {
            init,
            learning_rate,
            n_features,
            trees,
        };
        model.check()?;
        Ok(model)
    }

    /// Parse a model artifact
    pub fn from_json(text: &str) -> Result<Self, InferenceError> {
        let model: Self = serde_json::from_str(text).map_err(|e| InferenceError::ArtifactInvalid {
            artifact: "model",
            reason: e.to_string(),
        })?;
        model.check()?;
        Ok(model)
    }

    /// Load a model artifact file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InferenceError> {
        let path = path.as_ref();
        let model = Self::from_json(&read_artifact(path)?)?;
        debug!(
            "Loaded gradient boosting model from {} ({} trees, lr={})",
            path.display(),
            model.trees.len(),
            model.learning_rate
        );
        Ok(model)
    }

    fn check(&self) -> Result<(), InferenceError> {
        let invalid = |reason: String| InferenceError::ArtifactInvalid {
            artifact: "model",
            reason,
        };
        if !self.init.is_finite() || !self.learning_rate.is_finite() {
            return Err(invalid("non-finite init or learning_rate".to_string()));
        }
        if self.n_features == 0 {
            return Err(invalid("n_features is zero".to_string()));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.check(self.n_features)
                .map_err(|reason| invalid(format!("tree {}: {}", i, reason)))?;
        }
        Ok(())
    }
}

impl Regressor for GradientBoostingRegressor {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, row: &[f64]) -> Result<f64, InferenceError> {
        if row.len() != self.n_features {
            return Err(InferenceError::InvalidInputShape {
                expected: self.n_features,
                actual: row.len(),
            });
        }
        let mut boost = 0.0;
        for tree in &self.trees {
            boost += tree.evaluate(row)?;
        }
        Ok(self.init + self.learning_rate * boost)
    }
}
