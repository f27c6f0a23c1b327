//! Upstream price sources.
//!
//! A [`PriceSource`] answers the three queries the proxy serves: the latest
//! traded price for a symbol, the oldest known daily BTC candle, and the close
//! of the last candle ending at or before a given time. Implementations are
//! plain request/response: no retries, no caching.

pub mod binance;

use async_trait::async_trait;
use reqwest::StatusCode;
use std::fmt;

pub use binance::BinanceClient;

/// Symbols the proxy quotes spot prices for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpotSymbol {
    BtcUsdt,
    UsdtBrl,
}

impl SpotSymbol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BtcUsdt => "BTCUSDT",
            Self::UsdtBrl => "USDTBRL",
        }
    }
}

impl fmt::Display for SpotSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Candle resolution used for a historical lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandleInterval {
    Hourly,
    Daily,
}

/// Periods short enough that a daily candle would round the "as of" time too coarsely.
const HOURLY_PERIODS: &[&str] = &["1D", "1W", "1M"];

impl CandleInterval {
    /// Pick the candle resolution for a period label.
    pub fn for_period(period: &str) -> Self {
        if HOURLY_PERIODS.contains(&period) {
            Self::Hourly
        } else {
            Self::Daily
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hourly => "1h",
            Self::Daily => "1d",
        }
    }
}

/// The oldest BTC price upstream knows about.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EarliestPrice {
    pub price: f64,
    /// Open time of the originating candle, unix milliseconds.
    pub timestamp: i64,
}

/// Failure talking to the upstream exchange.
///
/// "No data" is not an error; operations that can legitimately come back empty
/// return `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("malformed upstream response: {0}")]
    Format(String),
}

impl FetchError {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }
}

/// Source of raw price data for the freshness cache.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Latest traded price for `symbol`.
    async fn spot_price(&self, symbol: SpotSymbol) -> Result<f64, FetchError>;

    /// Close price and open time of the oldest daily BTC/USDT candle.
    async fn earliest_price(&self) -> Result<Option<EarliestPrice>, FetchError>;

    /// Close price of the most recent candle ending at or before `as_of_ms`,
    /// at the resolution [`CandleInterval::for_period`] picks for `period`.
    async fn historical_price(&self, period: &str, as_of_ms: i64)
        -> Result<Option<f64>, FetchError>;
}
