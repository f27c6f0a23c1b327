use clap::Parser;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 10;
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:8000";

#[derive(Parser, Debug, Clone)]
#[command(name = "price-cache-proxy")]
#[command(about = "Caching proxy for exchange BTC price queries", version)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Base URL of the exchange REST API
    #[arg(long, env = "UPSTREAM_API_URL", default_value = crate::upstream::binance::DEFAULT_API_URL)]
    pub upstream_url: String,

    /// Seconds a fetched price is served before it is refreshed
    #[arg(long, env = "CACHE_TTL_SECS", default_value_t = DEFAULT_CACHE_TTL_SECS)]
    pub cache_ttl_secs: u64,

    /// Origins allowed to call the API from a browser (comma separated)
    #[arg(
        long,
        env = "ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_value = DEFAULT_ALLOWED_ORIGIN
    )]
    pub allowed_origins: Vec<String>,

    /// Expire each historical period on its own instead of sharing one timestamp
    #[arg(long, env = "PER_PERIOD_HISTORICAL")]
    pub per_period_historical: bool,
}
