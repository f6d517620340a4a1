//! Schema Routes

use axum::{extract::State, Json};
use feature_engine::{CategorySchema, FEATURE_COLUMNS};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

/// Feature layout and the options a form should offer
#[derive(Debug, Serialize)]
pub struct SchemaResponse {
    pub feature_columns: Vec<&'static str>,
    pub categories: CategorySchema,
    pub prediction_available: bool,
}

/// Get the feature schema
pub async fn get_schema(State(state): State<Arc<AppState>>) -> Json<SchemaResponse> {
    Json(SchemaResponse {
        feature_columns: FEATURE_COLUMNS.to_vec(),
        categories: state.schema().clone(),
        prediction_available: state.pipeline.is_some(),
    })
}
