//! Server configuration
//!
//! Layered: built-in defaults, then an optional TOML file, then `SALARY__*`
//! environment variables (e.g. `SALARY__SERVER__BIND_ADDR`).

use config::{Config, ConfigError, Environment, File};
use data_validator::ValidationConfig;
use inference_engine::{ArtifactPaths, ModelFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::Level;

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "SALARY_PREDICTOR_CONFIG";

/// Config file used when [`CONFIG_PATH_ENV`] is unset
pub const DEFAULT_CONFIG_PATH: &str = "salary-predictor.toml";

/// What to do when the artifacts cannot be loaded at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingArtifactPolicy {
    /// Keep serving, report prediction as unavailable
    #[default]
    Disable,
    /// Fail startup
    Halt,
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub artifacts: ArtifactConfig,
    pub validation: ValidationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Where the fitted schema, scaler and regressor live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Directory holding the artifacts
    pub dir: PathBuf,
    /// Overrides for individual file names, relative to `dir`
    pub schema_file: Option<PathBuf>,
    pub scaler_file: Option<PathBuf>,
    pub model_file: Option<PathBuf>,
    pub model_format: ModelFormat,
    pub on_missing: MissingArtifactPolicy,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("artifacts"),
            schema_file: None,
            scaler_file: None,
            model_file: None,
            model_format: ModelFormat::default(),
            on_missing: MissingArtifactPolicy::default(),
        }
    }
}

impl ArtifactConfig {
    /// Resolve the artifact file locations
    pub fn paths(&self) -> ArtifactPaths {
        let mut paths = ArtifactPaths::in_dir(&self.dir, self.model_format);
        if let Some(file) = &self.schema_file {
            paths.schema = self.dir.join(file);
        }
        if let Some(file) = &self.scaler_file {
            paths.scaler = self.dir.join(file);
        }
        if let Some(file) = &self.model_file {
            paths.model = self.dir.join(file);
        }
        paths
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Max level: trace, debug, info, warn, error
    pub level: String,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Parsed `level`
    pub fn max_level(&self) -> Result<Level, ConfigError> {
        self.level
            .parse::<Level>()
            .map_err(|_| ConfigError::Message(format!("invalid logging.level '{}'", self.level)))
    }
}

impl AppConfig {
    /// Load from `path` (optional) and the environment
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let config: Self = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("SALARY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.logging.max_level()?;
        Ok(config)
    }

    /// Load from the file named by `SALARY_PREDICTOR_CONFIG`, or the default
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load(&path)
    }
}
