//! Price cache proxy binary.
//!
//! Run with:
//! ```bash
//! PORT=3000 price-cache-proxy --allowed-origins https://calculator.example
//! ```

use anyhow::Result;
use clap::Parser;
use price_cache_proxy::utils::logging::init_logging;
use price_cache_proxy::{Application, Args};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    init_logging();

    let args = Args::parse();
    let app = Application::init(args)?;

    let config = app.config();
    info!("Starting price proxy");
    info!("  Upstream: {}", config.upstream_url);
    info!("  Cache TTL: {:?}", config.cache_ttl);
    info!("  Historical staleness: {:?}", config.historical_staleness);
    info!("  Allowed origins: {}", config.allowed_origins.join(", "));

    app.run().await
}
