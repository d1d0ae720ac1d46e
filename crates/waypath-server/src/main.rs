use anyhow::{Context, Result};
use waypath_server::config::ServerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration from environment variables
    let config = ServerConfig::load().context("Failed to load configuration")?;

    // Set up monitoring
    waypath_monitoring::init(config.monitoring()).context("Failed to initialize monitoring")?;
    config.log_warnings();

    // Run the server using the library's run function
    waypath_server::run(config).await.context("Server error")?;

    waypath_monitoring::shutdown();
    Ok(())
}
