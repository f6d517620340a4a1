//! Artifact Loading
//!
//! The schema, scaler and regressor are read once and then shared read-only
//! for the rest of the process.

use crate::model::{GradientBoostingRegressor, Regressor};
use crate::onnx::OnnxRegressor;
use crate::scaler::{Scaler, StandardScaler};
use crate::InferenceError;
use feature_engine::{CategorySchema, FEATURE_COLUMNS, FEATURE_DIMENSION};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

/// Serialization format of the regressor artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    /// Flat-array gradient boosting trees as JSON
    #[default]
    Json,
    /// ONNX graph run through tract
    Onnx,
}

/// Locations of the three artifact files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub schema: PathBuf,
    pub scaler: PathBuf,
    pub model: PathBuf,
    pub format: ModelFormat,
}

impl ArtifactPaths {
    /// Conventional file names inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>, format: ModelFormat) -> Self {
        let dir = dir.as_ref();
        let model = match format {
            ModelFormat::Json => "model.json",
            ModelFormat::Onnx => "model.onnx",
        };
        Self {
            schema: dir.join("schema.json"),
            scaler: dir.join("scaler.json"),
            model: dir.join(model),
            format,
        }
    }
}

pub(crate) fn read_artifact(path: &Path) -> Result<String, InferenceError> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => InferenceError::ArtifactMissing(path.display().to_string()),
        _ => InferenceError::ModelLoadError(format!("{}: {}", path.display(), e)),
    })
}

/// Loaded, immutable schema + scaler + regressor
#[derive(Clone)]
pub struct ModelArtifacts {
    pub schema: CategorySchema,
    pub scaler: Arc<dyn Scaler>,
    pub model: Arc<dyn Regressor>,
}

impl ModelArtifacts {
    /// Assemble artifacts, checking that they agree on the feature layout
    pub fn new(
        schema: CategorySchema,
        scaler: Arc<dyn Scaler>,
        model: Arc<dyn Regressor>,
    ) -> Result<Self, InferenceError> {
        verify_feature_layout(scaler.as_ref(), model.as_ref())?;
        Ok(Self {
            schema,
            scaler,
            model,
        })
    }

    /// Read every artifact from disk
    pub fn load(paths: &ArtifactPaths) -> Result<Self, InferenceError> {
        for path in [&paths.schema, &paths.scaler, &paths.model] {
            if !path.exists() {
                warn!("Artifact missing: {}", path.display());
                return Err(InferenceError::ArtifactMissing(path.display().to_string()));
            }
        }

        let schema = CategorySchema::load(&paths.schema)?;
        let scaler: Arc<dyn Scaler> = Arc::new(StandardScaler::load(&paths.scaler)?);
        let model: Arc<dyn Regressor> = match paths.format {
            ModelFormat::Json => Arc::new(GradientBoostingRegressor::load(&paths.model)?),
            ModelFormat::Onnx => Arc::new(OnnxRegressor::load(&paths.model, FEATURE_DIMENSION)?),
        };

        let artifacts = Self::new(schema, scaler, model)?;
        info!(
            "Artifacts loaded: schema={}, scaler={}, model={} ({:?})",
            paths.schema.display(),
            paths.scaler.display(),
            paths.model.display(),
            paths.format
        );
        Ok(artifacts)
    }
}

/// Check that scaler and regressor were fitted on the encoder's 9 columns,
/// in the encoder's order when the scaler recorded column names
pub fn verify_feature_layout(scaler: &dyn Scaler, model: &dyn Regressor) -> Result<(), InferenceError> {
    if scaler.n_features() != FEATURE_DIMENSION {
        return Err(InferenceError::InvalidInputShape {
            expected: scaler.n_features(),
            actual: FEATURE_DIMENSION,
        });
    }
    if model.n_features() != FEATURE_DIMENSION {
        return Err(InferenceError::InvalidInputShape {
            expected: model.n_features(),
            actual: FEATURE_DIMENSION,
        });
    }
    if let Some(names) = scaler.feature_names() {
        for (i, (fitted, encoded)) in names.iter().zip(FEATURE_COLUMNS.iter()).enumerate() {
            if fitted != encoded {
                return Err(InferenceError::SchemaMismatch(format!(
                    "column {} is '{}' in the scaler but '{}' in the encoder",
                    i, fitted, encoded
                )));
            }
        }
    }
    Ok(())
}

/// Once-initialized shared handle to the artifacts.
///
/// The first successful load is kept for the life of the cache; failures are
/// not cached.
pub struct ArtifactCache {
    paths: ArtifactPaths,
    cell: OnceLock<Arc<ModelArtifacts>>,
}

impl ArtifactCache {
    pub fn new(paths: ArtifactPaths) -> Self {
        Self {
            paths,
            cell: OnceLock::new(),
        }
    }

    /// Return the cached artifacts, loading them on first use
    pub fn get_or_load(&self) -> Result<Arc<ModelArtifacts>, InferenceError> {
        if let Some(artifacts) = self.cell.get() {
            return Ok(Arc::clone(artifacts));
        }
        let loaded = Arc::new(ModelArtifacts::load(&self.paths)?);
        // A concurrent caller may have filled the cell first; keep theirs
        Ok(Arc::clone(self.cell.get_or_init(|| loaded)))
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }
}
