//! Server configuration.

use crate::args::Args;
use crate::cache::HistoricalStaleness;
use anyhow::{bail, Context, Result};
use reqwest::Url;
use std::net::SocketAddr;
use std::time::Duration;

/// Validated configuration of a running proxy.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub upstream_url: Url,
    pub cache_ttl: Duration,
    pub allowed_origins: Vec<String>,
    pub historical_staleness: HistoricalStaleness,
}

impl ServerConfig {
    /// Build the configuration from parsed CLI/environment arguments.
    pub fn from_args(args: Args) -> Result<Self> {
        if args.port < 1 {
            bail!("Port number must be between 1 and 65535");
        }
        if args.cache_ttl_secs == 0 {
            bail!("Cache TTL must be at least one second");
        }

        let upstream_url = Url::parse(args.upstream_url.trim())
            .with_context(|| format!("Invalid upstream API URL: {}", args.upstream_url))?;

        let allowed_origins = args
            .allowed_origins
            .into_iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        let historical_staleness = if args.per_period_historical {
            HistoricalStaleness::PerPeriod
        } else {
            HistoricalStaleness::Shared
        };

        Ok(Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], args.port)),
            upstream_url,
            cache_ttl: Duration::from_secs(args.cache_ttl_secs),
            allowed_origins,
            historical_staleness,
        })
    }
}
