//! Prediction Routes

use axum::{extract::State, Json};
use feature_engine::{FeatureVector, ParticipantInput};
use inference_engine::format_salary;
use metrics::{counter, histogram};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::ApiError;
use crate::AppState;

/// Response for the predictions endpoint
#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    /// Predicted first salary, millions of rupiah
    pub salary_millions: f64,
    /// Display line for the form
    pub display: String,
    /// Unscaled encoded row, model column order
    pub features: FeatureVector,
    /// Validation findings that did not block the prediction
    pub warnings: Vec<String>,
}

/// Predict the first salary for one participant
pub async fn create_prediction(
    State(state): State<Arc<AppState>>,
    Json(input): Json<ParticipantInput>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let pipeline = state.pipeline.as_ref().ok_or(ApiError::PredictionUnavailable)?;

    let report = state.validator.validate(&input, pipeline.encoder().schema());
    let warnings = report.messages();
    if !report.valid {
        counter!("salary_input_warnings_total").increment(warnings.len() as u64);
        if state.validator.config().strict {
            return Err(ApiError::InvalidInput(warnings));
        }
        warn!("Predicting despite input issues: {}", warnings.join("; "));
    }

    let estimate = pipeline.predict(&input).map_err(|e| {
        counter!("salary_prediction_failures_total").increment(1);
        error!("Prediction failed: {}", e);
        ApiError::PredictionFailed
    })?;

    counter!("salary_predictions_total").increment(1);
    histogram!("salary_prediction_latency_us").record(estimate.latency_us as f64);
    info!("Predicted first salary: {}", estimate);

    Ok(Json(PredictionResponse {
        salary_millions: estimate.salary_millions,
        display: format!(
            "Gaji Pertama yang Diprediksi: {} Juta Rupiah",
            format_salary(estimate.salary_millions)
        ),
        features: estimate.features,
        warnings,
    }))
}
