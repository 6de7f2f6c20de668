//! HarvestHub - Main Entry Point

use api::{init_logging, run_server, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_logging(&config.server);

    info!("=== HarvestHub v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Advisor mode: {}",
        if config.advisor.mock { "mock" } else { "live" }
    );

    run_server(config).await?;

    Ok(())
}
