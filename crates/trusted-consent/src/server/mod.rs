//! HTTP server shell.
//!
//! Hosts the consent route behind CSRF protection, serves static assets, and
//! renders every error through one error-page layer.

pub mod csrf;
pub mod error_pages;
pub mod routes;
pub mod views;

use std::sync::Arc;

use anyhow::Context;
use axum::Router;

use crate::client::HydraAdminClient;
use crate::config::Config;
use crate::consent::ConsentAdmin;

/// Consent server.
pub struct ConsentServer {
    /// Server configuration.
    config: Config,

    /// Admin API used by the consent route.
    admin: Arc<dyn ConsentAdmin>,
}

impl ConsentServer {
    /// Create a server talking to the admin API named in `config`.
    ///
    /// # Errors
    ///
    /// Returns error if the admin client cannot be built.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let client = HydraAdminClient::new(&config.admin)?;
        tracing::debug!(admin = ?client, "Admin API client ready");
        Ok(Self::with_admin(config, Arc::new(client)))
    }

    /// Create a server with a custom admin implementation.
    #[must_use]
    pub fn with_admin(config: Config, admin: Arc<dyn ConsentAdmin>) -> Self {
        Self { config, admin }
    }

    /// Build the router.
    #[must_use]
    pub fn router(&self) -> Router {
        routes::create_router(Arc::clone(&self.admin), &self.config)
    }

    /// Server configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Bind and serve until Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns error if binding fails or the server stops with an I/O error.
    pub async fn run(self) -> anyhow::Result<()> {
        let router = self.router();
        let address = self.config.listen_address();

        let listener = tokio::net::TcpListener::bind((self.config.host.as_str(), self.config.port))
            .await
            .with_context(|| format!("failed to bind {address}"))?;

        tracing::info!(environment = ?self.config.environment, "Listening on http://{}", address);

        axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

        tracing::info!("HTTP server shut down");
        Ok(())
    }
}

impl std::fmt::Debug for ConsentServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsentServer").field("config", &self.config).finish()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}
