//! Prediction Pipeline

use crate::artifacts::{verify_feature_layout, ModelArtifacts};
use crate::model::Regressor;
use crate::scaler::Scaler;
use crate::InferenceError;
use feature_engine::{CategorySchema, FeatureEncoder, FeatureVector, ParticipantInput};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Render a salary figure (millions of rupiah) with two decimals
pub fn format_salary(salary_millions: f64) -> String {
    format!("{:.2}", salary_millions)
}

/// Result of one prediction
#[derive(Debug, Clone, Serialize)]
pub struct SalaryEstimate {
    /// Predicted first salary in millions of rupiah
    pub salary_millions: f64,
    /// Unscaled encoded row
    pub features: FeatureVector,
    /// Row after the scaler
    pub scaled_features: Vec<f64>,
    /// Encode + scale + predict time
    pub latency_us: u64,
}

impl fmt::Display for SalaryEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Juta Rupiah", format_salary(self.salary_millions))
    }
}

/// Encode -> scale -> predict over shared, read-only artifacts
#[derive(Clone)]
pub struct PredictionPipeline {
    encoder: FeatureEncoder,
    scaler: Arc<dyn Scaler>,
    model: Arc<dyn Regressor>,
}

impl PredictionPipeline {
    /// Create a pipeline, rejecting artifacts fitted on another feature layout
    pub fn new(
        schema: CategorySchema,
        scaler: Arc<dyn Scaler>,
        model: Arc<dyn Regressor>,
    ) -> Result<Self, InferenceError> {
        verify_feature_layout(scaler.as_ref(), model.as_ref())?;
        Ok(Self {
            encoder: FeatureEncoder::new(schema),
            scaler,
            model,
        })
    }

    /// Create a pipeline over already-loaded artifacts
    pub fn from_artifacts(artifacts: &ModelArtifacts) -> Self {
        Self {
            encoder: FeatureEncoder::new(artifacts.schema.clone()),
            scaler: Arc::clone(&artifacts.scaler),
            model: Arc::clone(&artifacts.model),
        }
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    /// Run one participant through the pipeline
    pub fn predict(&self, input: &ParticipantInput) -> Result<SalaryEstimate, InferenceError> {
        let start = Instant::now();

        let features = self.encoder.encode(input);
        if features.len() != self.scaler.n_features() {
            return Err(InferenceError::InvalidInputShape {
                expected: self.scaler.n_features(),
                actual: features.len(),
            });
        }

        let scaled_features = self.scaler.transform(features.as_slice())?;
        let salary_millions = self.model.predict(&scaled_features)?;
        if !salary_millions.is_finite() {
            return Err(InferenceError::InferenceFailed(format!(
                "model returned {}",
                salary_millions
            )));
        }

        let latency_us = start.elapsed().as_micros() as u64;
        debug!(
            "Predicted salary {} in {}us",
            format_salary(salary_millions),
            latency_us
        );

        Ok(SalaryEstimate {
            salary_millions,
            features,
            scaled_features,
            latency_us,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{ArtifactCache, ArtifactPaths, ModelFormat};
    use crate::model::{GradientBoostingRegressor, RegressionTree};
    use feature_engine::FEATURE_DIMENSION;
    use proptest::prelude::*;
    use std::path::Path;

    struct IdentityScaler;

    impl Scaler for IdentityScaler {
        fn n_features(&self) -> usize {
            FEATURE_DIMENSION
        }

        fn transform(&self, row: &[f64]) -> Result<Vec<f64>, InferenceError> {
            Ok(row.to_vec())
        }
    }

    struct SumModel;

    impl Regressor for SumModel {
        fn n_features(&self) -> usize {
            FEATURE_DIMENSION
        }

        fn predict(&self, row: &[f64]) -> Result<f64, InferenceError> {
            Ok(row.iter().sum())
        }
    }

    /// Claims 9 columns but drops the last one
    struct TruncatingScaler;

    impl Scaler for TruncatingScaler {
        fn n_features(&self) -> usize {
            FEATURE_DIMENSION
        }

        fn transform(&self, row: &[f64]) -> Result<Vec<f64>, InferenceError> {
            Ok(row[..row.len() - 1].to_vec())
        }
    }

    /// Single tree used as-is, without the ensemble's structural checks
    struct BareTreeModel(RegressionTree);

    impl Regressor for BareTreeModel {
        fn n_features(&self) -> usize {
            FEATURE_DIMENSION
        }

        fn predict(&self, row: &[f64]) -> Result<f64, InferenceError> {
            self.0.evaluate(row)
        }
    }

    struct NanModel;

    impl Regressor for NanModel {
        fn n_features(&self) -> usize {
            FEATURE_DIMENSION
        }

        fn predict(&self, _row: &[f64]) -> Result<f64, InferenceError> {
            Ok(f64::NAN)
        }
    }

    fn sample_input() -> ParticipantInput {
        ParticipantInput {
            age: 25,
            training_duration_hours: 60.0,
            exam_score: 75.0,
            education_level: "S1".to_string(),
            major: "Administrasi".to_string(),
            gender: "Laki-laki".to_string(),
            employment_status: "Belum Bekerja".to_string(),
        }
    }

    fn fixture_paths() -> ArtifactPaths {
        ArtifactPaths::in_dir(
            Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata"),
            ModelFormat::Json,
        )
    }

    fn sum_pipeline() -> PredictionPipeline {
        PredictionPipeline::new(
            CategorySchema::default(),
            Arc::new(IdentityScaler),
            Arc::new(SumModel),
        )
        .unwrap()
    }

    #[test]
    fn test_identity_scaler_sum_model() {
        let estimate = sum_pipeline().predict(&sample_input()).unwrap();
        // 25 + 60 + 75 + 3 + 0 + 1 + 0 + 1 + 0
        assert_eq!(estimate.salary_millions, 165.0);
        assert_eq!(estimate.scaled_features, estimate.features.as_slice().to_vec());
    }

    #[test]
    fn test_fixture_prediction() {
        let artifacts = ModelArtifacts::load(&fixture_paths()).unwrap();
        let pipeline = PredictionPipeline::from_artifacts(&artifacts);

        let estimate = pipeline.predict(&sample_input()).unwrap();
        assert!((estimate.salary_millions - 5.03).abs() < 1e-9);
        assert_eq!(estimate.to_string(), "5.03 Juta Rupiah");

        let input = ParticipantInput {
            education_level: "SMA".to_string(),
            gender: "Wanita".to_string(),
            employment_status: "Sudah Bekerja".to_string(),
            ..sample_input()
        };
        let estimate = pipeline.predict(&input).unwrap();
        assert!((estimate.salary_millions - 5.05).abs() < 1e-9);
    }

    #[test]
    fn test_onnx_fixture_prediction() {
        let paths = ArtifactPaths::in_dir(
            Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata"),
            ModelFormat::Onnx,
        );
        let artifacts = ModelArtifacts::load(&paths).unwrap();
        let estimate = PredictionPipeline::from_artifacts(&artifacts)
            .predict(&sample_input())
            .unwrap();
        // 2 + 0.5 * sum of the scaled reference row
        let expected = 2.0 + 0.5 * estimate.scaled_features.iter().sum::<f64>();
        assert!((estimate.salary_millions - expected).abs() < 1e-5);
        assert!((estimate.salary_millions - 0.883_333).abs() < 1e-4);
        assert_eq!(estimate.to_string(), "0.88 Juta Rupiah");
    }

    #[test]
    fn test_reloading_does_not_change_output() {
        let first = PredictionPipeline::from_artifacts(&ModelArtifacts::load(&fixture_paths()).unwrap());
        let second = PredictionPipeline::from_artifacts(&ModelArtifacts::load(&fixture_paths()).unwrap());
        let cache = ArtifactCache::new(fixture_paths());
        let cached = PredictionPipeline::from_artifacts(&cache.get_or_load().unwrap());
        let recached = PredictionPipeline::from_artifacts(&cache.get_or_load().unwrap());

        let input = sample_input();
        let expected = first.predict(&input).unwrap().salary_millions;
        for pipeline in [&second, &cached, &recached] {
            assert_eq!(pipeline.predict(&input).unwrap().salary_millions, expected);
        }
    }

    #[test]
    fn test_unknown_category_still_predicts() {
        let input = ParticipantInput {
            education_level: "PhD".to_string(),
            ..sample_input()
        };
        let estimate = sum_pipeline().predict(&input).unwrap();
        assert_eq!(estimate.features.get("Pendidikan"), Some(-1.0));
        assert_eq!(estimate.salary_millions, 161.0);
    }

    #[test]
    fn test_shape_error_propagates() {
        let pipeline = PredictionPipeline::new(
            CategorySchema::default(),
            Arc::new(TruncatingScaler),
            Arc::new(GradientBoostingRegressor::new(0.0, 0.1, FEATURE_DIMENSION, vec![]).unwrap()),
        )
        .unwrap();
        assert!(matches!(
            pipeline.predict(&sample_input()),
            Err(InferenceError::InvalidInputShape { expected: 9, actual: 8 })
        ));
    }

    #[test]
    fn test_split_outside_row_is_an_error() {
        let stump = RegressionTree::new(
            vec![1, -1, -1],
            vec![2, -1, -1],
            vec![42, -2, -2],
            vec![0.0, -2.0, -2.0],
            vec![0.0, 1.0, 2.0],
        );
        assert!(
            GradientBoostingRegressor::new(0.0, 0.1, FEATURE_DIMENSION, vec![stump.clone()]).is_err()
        );

        let pipeline = PredictionPipeline::new(
            CategorySchema::default(),
            Arc::new(IdentityScaler),
            Arc::new(BareTreeModel(stump)),
        )
        .unwrap();
        assert!(matches!(
            pipeline.predict(&sample_input()),
            Err(InferenceError::InferenceFailed(_))
        ));
    }

    #[test]
    fn test_non_finite_output() {
        let pipeline =
            PredictionPipeline::new(CategorySchema::default(), Arc::new(IdentityScaler), Arc::new(NanModel))
                .unwrap();
        assert!(matches!(
            pipeline.predict(&sample_input()),
            Err(InferenceError::InferenceFailed(_))
        ));
    }

    #[test]
    fn test_format_salary() {
        assert_eq!(format_salary(4.5), "4.50");
        assert_eq!(format_salary(12.345678), "12.35");
    }

    proptest! {
        #[test]
        fn prop_sum_model_matches_unscaled_sum(
            age in 18u32..=60,
            hours in 20.0f64..=1000.0,
            score in 50.0f64..=100.0,
        ) {
            let input = ParticipantInput {
                age,
                training_duration_hours: hours,
                exam_score: score,
                ..sample_input()
            };
            let estimate = sum_pipeline().predict(&input).unwrap();
            let expected: f64 = estimate.features.as_slice().iter().sum();
            prop_assert_eq!(estimate.salary_millions, expected);
        }
    }
}
