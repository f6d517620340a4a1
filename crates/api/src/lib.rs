//! Salary Prediction API Server
//!
//! HTTP surface for the first-salary prediction pipeline: the form posts a
//! participant, the server encodes, scales and predicts.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use data_validator::{ValidationConfig, Validator};
use feature_engine::CategorySchema;
use inference_engine::{InferenceError, ModelArtifacts, PredictionPipeline};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

pub mod config;
mod error;
mod routes;

pub use config::{AppConfig, LoggingConfig, MissingArtifactPolicy};
pub use error::ApiError;

/// Application state shared read-only across handlers
pub struct AppState {
    /// Prediction pipeline, absent when artifacts failed to load
    pub pipeline: Option<PredictionPipeline>,
    /// Input validator
    pub validator: Validator,
    /// Prometheus exporter handle
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
    fallback_schema: CategorySchema,
}

impl AppState {
    /// Create application state around an optional pipeline
    pub fn new(pipeline: Option<PredictionPipeline>, validation: ValidationConfig) -> Self {
        Self {
            pipeline,
            validator: Validator::new(validation),
            metrics: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
            fallback_schema: CategorySchema::default(),
        }
    }

    /// Load artifacts per `config`, applying the missing-artifact policy
    pub fn from_config(config: &AppConfig) -> Result<Self, InferenceError> {
        let pipeline = match ModelArtifacts::load(&config.artifacts.paths()) {
            Ok(artifacts) => Some(PredictionPipeline::from_artifacts(&artifacts)),
            Err(e)
                if e.is_load_failure()
                    && config.artifacts.on_missing == MissingArtifactPolicy::Disable =>
            {
                warn!("Prediction disabled, artifacts unavailable: {}", e);
                None
            }
            Err(e) => return Err(e),
        };
        Ok(Self::new(pipeline, config.validation.clone()))
    }

    /// Attach a Prometheus handle for `/metrics`
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Category schema in effect for encoding
    pub fn schema(&self) -> &CategorySchema {
        self.pipeline
            .as_ref()
            .map(|p| p.encoder().schema())
            .unwrap_or(&self.fallback_schema)
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: ComponentStatus,
}

/// Component status
#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub prediction: String,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/schema", get(routes::schema::get_schema))
        .route("/api/v1/predictions", post(routes::predictions::create_prediction))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let (status, prediction) = if state.pipeline.is_some() {
        ("healthy", "ok")
    } else {
        ("degraded", "unavailable")
    };

    Json(HealthResponse {
        status: status.to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        components: ComponentStatus {
            prediction: prediction.to_string(),
        },
    })
}

/// Prometheus text exposition
async fn metrics_handler(State(state): State<Arc<AppState>>) -> String {
    state
        .metrics
        .as_ref()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}

/// Initialize logging, rejecting an unknown level
pub fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let builder = FmtSubscriber::builder()
        .with_max_level(config.max_level()?)
        .with_target(true);

    if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

/// Run the server
pub async fn run_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    let state = Arc::new(AppState::from_config(&config)?.with_metrics(handle));
    let app = create_router(state);

    info!("Starting API server on {}", config.server.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArtifactConfig;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use inference_engine::{ArtifactPaths, ModelFormat};
    use serde_json::{json, Value};
    use std::path::PathBuf;
    use tower::ServiceExt;

    fn testdata() -> PathBuf {
        PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../inference-engine/testdata"))
    }

    fn fixture_pipeline() -> PredictionPipeline {
        let artifacts = ModelArtifacts::load(&ArtifactPaths::in_dir(testdata(), ModelFormat::Json))
            .unwrap_or_else(|e| panic!("fixture artifacts: {}", e));
        PredictionPipeline::from_artifacts(&artifacts)
    }

    fn app(pipeline: Option<PredictionPipeline>, validation: ValidationConfig) -> Router {
        create_router(Arc::new(AppState::new(pipeline, validation)))
    }

    fn participant() -> Value {
        json!({
            "age": 25,
            "training_duration_hours": 60,
            "exam_score": 75.0,
            "education_level": "S1",
            "major": "Administrasi",
            "gender": "Laki-laki",
            "employment_status": "Belum Bekerja"
        })
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_prediction(body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/predictions")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_prediction() {
        let app = app(Some(fixture_pipeline()), ValidationConfig::default());
        let (status, body) = send(app, post_prediction(&participant())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["display"], "Gaji Pertama yang Diprediksi: 5.03 Juta Rupiah");
        assert_eq!(body["features"], json!([25.0, 60.0, 75.0, 3.0, 0.0, 1.0, 0.0, 1.0, 0.0]));
        assert_eq!(body["warnings"], json!([]));
    }

    #[tokio::test]
    async fn test_unknown_category_warns_but_predicts() {
        let app = app(Some(fixture_pipeline()), ValidationConfig::default());
        let mut input = participant();
        input["education_level"] = json!("PhD");
        let (status, body) = send(app, post_prediction(&input)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["features"][3], json!(-1.0));
        assert_eq!(body["warnings"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_strict_validation_rejects() {
        let validation = ValidationConfig {
            strict: true,
            ..Default::default()
        };
        let app = app(Some(fixture_pipeline()), validation);
        let mut input = participant();
        input["age"] = json!(75);
        let (status, body) = send(app, post_prediction(&input)).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["details"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_prediction_unavailable_without_artifacts() {
        let app = app(None, ValidationConfig::default());
        let (status, _) = send(app.clone(), post_prediction(&participant())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, body) = send(app, get("/api/v1/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["components"]["prediction"], "unavailable");
    }

    #[tokio::test]
    async fn test_schema_lists_categories() {
        let app = app(Some(fixture_pipeline()), ValidationConfig::default());
        let (status, body) = send(app, get("/api/v1/schema")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["feature_columns"][0], "Usia");
        assert_eq!(body["categories"]["education_levels"], json!(["SMA", "SMK", "D3", "S1", "S2"]));
        assert_eq!(body["prediction_available"], true);
    }

    #[test]
    fn test_missing_artifacts_policy() {
        let mut config = AppConfig {
            artifacts: ArtifactConfig {
                dir: PathBuf::from("/nonexistent/artifacts"),
                ..Default::default()
            },
            ..Default::default()
        };
        let state = AppState::from_config(&config).unwrap_or_else(|e| panic!("{}", e));
        assert!(state.pipeline.is_none());

        config.artifacts.on_missing = MissingArtifactPolicy::Halt;
        assert!(AppState::from_config(&config).is_err());
    }

    #[test]
    fn test_state_from_fixture_config() {
        let config = AppConfig {
            artifacts: ArtifactConfig {
                dir: testdata(),
                on_missing: MissingArtifactPolicy::Halt,
                ..Default::default()
            },
            ..Default::default()
        };
        let state = AppState::from_config(&config).unwrap_or_else(|e| panic!("{}", e));
        assert!(state.pipeline.is_some());
    }

    #[test]
    fn test_state_reports_broken_artifacts() {
        let mut config = AppConfig {
            artifacts: ArtifactConfig {
                dir: testdata(),
                scaler_file: Some(PathBuf::from("schema.json")),
                on_missing: MissingArtifactPolicy::Disable,
                ..Default::default()
            },
            ..Default::default()
        };
        let state = AppState::from_config(&config).unwrap_or_else(|e| panic!("{}", e));
        assert!(state.pipeline.is_none());

        config.artifacts.on_missing = MissingArtifactPolicy::Halt;
        assert!(matches!(
            AppState::from_config(&config),
            Err(InferenceError::ArtifactInvalid { artifact: "scaler", .. })
        ));

        config.artifacts.scaler_file = None;
        config.artifacts.model_format = ModelFormat::Onnx;
        let state = AppState::from_config(&config).unwrap_or_else(|e| panic!("{}", e));
        assert!(state.pipeline.is_some());
    }

    #[test]
    fn test_init_logging_rejects_unknown_level() {
        let config = LoggingConfig {
            level: "loud".to_string(),
            json: false,
        };
        let err = init_logging(&config).unwrap_err();
        assert!(err.to_string().contains("loud"));
    }
}
