//! Salary Predictor - Main Entry Point

use api::{init_logging, run_server, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    init_logging(&config.logging)?;

    info!("=== Salary Predictor v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Loading artifacts from {}", config.artifacts.dir.display());

    run_server(config).await?;

    Ok(())
}
