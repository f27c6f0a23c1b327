use crate::args::Args;
use crate::cache::FreshnessCache;
use crate::config::ServerConfig;
use crate::server::{cors_layer, router, AppState};
use crate::upstream::BinanceClient;
use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// A configured proxy, ready to serve.
pub struct Application {
    config: ServerConfig,
    app: Router,
}

impl Application {
    pub fn init(args: Args) -> Result<Self> {
        let config = ServerConfig::from_args(args)?;

        let source = BinanceClient::new(&config.upstream_url)?;
        let cache = FreshnessCache::new(Arc::new(source), config.cache_ttl)
            .with_historical_staleness(config.historical_staleness);

        let app = router(AppState {
            cache: Arc::new(cache),
        })
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.allowed_origins)?);

        Ok(Self { config, app })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.config.bind_addr))?;

        info!("Price proxy listening on {}", self.config.bind_addr);

        axum::serve(listener, self.app)
            .await
            .context("HTTP server error")
    }
}
