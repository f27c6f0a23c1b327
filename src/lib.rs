//! Read-through caching proxy for exchange BTC prices.
//!
//! Serves three queries to a price-calculator front end while shielding the
//! exchange API from redundant traffic:
//!
//! - `GET /api/prices`: current BTC/USDT and USDT/BRL spot prices
//! - `GET /api/earliest-price`: the oldest daily BTC/USDT close upstream knows
//! - `GET /api/historical-price?period=<P>&timestamp=<ms>`: BTC close as of a past time
//!
//! ## Example Flow
//!
//! ```text
//! 1. Client sends: GET /api/prices
//! 2. Cache has no BTCUSDT value, fetches /ticker/price?symbol=BTCUSDT upstream
//! 3. Client sends the same request 5s later
//! 4. Both symbols are younger than the TTL, answered from the cache
//! ```

pub mod app;
pub mod args;
pub mod cache;
pub mod config;
pub mod server;
pub mod upstream;
pub mod utils;

#[cfg(test)]
mod testing;

pub use app::Application;
pub use args::Args;
pub use cache::{FreshnessCache, HistoricalStaleness, PricePoint};
pub use upstream::{BinanceClient, PriceSource};
