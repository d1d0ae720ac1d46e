//!
//! Waypath Server - process entry point for Waypath
//!
//! Owns the storage provider, builds the core runtime on top of it, seeds the
//! initial data and keeps the process alive until it is asked to stop. A
//! transport layer embeds [`AppContext`] and calls [`AppContext::runtime`].

use tracing::info;
use waypath_core::RuntimeInterface;
use waypath_state_inmemory::{InMemoryStateStoreProvider, StoreStats};

/// Configuration module
pub mod config;

/// Error module
pub mod error;

/// Startup data
pub mod seed;

// Re-export key types
pub use config::{SeedAccount, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use seed::SeedReport;

/// Storage and runtime for one server process
pub struct AppContext {
    provider: InMemoryStateStoreProvider,
    runtime: RuntimeInterface,
    seed_report: SeedReport,
}

impl AppContext {
    /// Create the store, build the runtime on it and seed it
    pub async fn build(config: &ServerConfig) -> ServerResult<Self> {
        let provider = InMemoryStateStoreProvider::new();
        let runtime =
            RuntimeInterface::create_with_repositories(provider.create_repositories(), &config.core)?;
        let seed_report = seed::seed(&runtime, config).await?;

        Ok(Self {
            provider,
            runtime,
            seed_report,
        })
    }

    /// The core API
    pub fn runtime(&self) -> &RuntimeInterface {
        &self.runtime
    }

    /// What was stored at startup
    pub fn seed_report(&self) -> &SeedReport {
        &self.seed_report
    }

    /// Current record counts
    pub async fn stats(&self) -> StoreStats {
        self.provider.stats().await
    }
}

/// Run function
///
/// Builds the context and waits for `shutdown` to resolve.
pub async fn run_until<F>(config: ServerConfig, shutdown: F) -> ServerResult<AppContext>
where
    F: std::future::Future<Output = ()>,
{
    let context = AppContext::build(&config).await?;
    let stats = context.stats().await;
    info!(
        graphs = stats.graphs,
        accounts = stats.accounts,
        smoothing_factor = config.core.moderation.smoothing_factor,
        auto_apply_threshold = config.core.moderation.auto_apply_threshold,
        "Waypath server ready"
    );

    shutdown.await;

    let stats = context.stats().await;
    info!(
        graphs = stats.graphs,
        accounts = stats.accounts,
        requests = stats.requests,
        trips = stats.trips,
        "Waypath server stopping"
    );
    Ok(context)
}

/// Run until ctrl-c
pub async fn run(config: ServerConfig) -> ServerResult<()> {
    run_until(config, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
    })
    .await?;
    Ok(())
}
