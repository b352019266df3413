//! Vision Inference API - Main Entry Point

use api::{init_logging, run_server, BoxError, Settings};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let settings = Settings::load()?;
    init_logging(&settings.logging)?;

    info!("=== Vision Inference API v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Model: {}", settings.model.path);

    run_server(settings).await
}
