//! Response bodies of the public API.

use crate::cache::SpotPrices;
use crate::upstream::EarliestPrice;
use serde::{Deserialize, Serialize};

/// GET /api/prices
#[derive(Debug, Serialize)]
pub struct PricesResponse {
    pub btcusdt: Option<f64>,
    pub usdtbrl: Option<f64>,
}

impl From<SpotPrices> for PricesResponse {
    fn from(prices: SpotPrices) -> Self {
        Self {
            btcusdt: Some(prices.btcusdt),
            usdtbrl: Some(prices.usdtbrl),
        }
    }
}

/// GET /api/earliest-price. `timestamp` is 0 when upstream has no candle.
#[derive(Debug, Serialize)]
pub struct EarliestPriceResponse {
    pub price: Option<f64>,
    pub timestamp: i64,
}

impl From<Option<EarliestPrice>> for EarliestPriceResponse {
    fn from(earliest: Option<EarliestPrice>) -> Self {
        match earliest {
            Some(e) => Self {
                price: Some(e.price),
                timestamp: e.timestamp,
            },
            None => Self {
                price: None,
                timestamp: 0,
            },
        }
    }
}

/// GET /api/historical-price
#[derive(Debug, Serialize)]
pub struct HistoricalPriceResponse {
    pub price: Option<f64>,
}

/// Query string of /api/historical-price.
#[derive(Debug, Deserialize)]
pub struct HistoricalQuery {
    pub period: String,
    /// Unix milliseconds.
    pub timestamp: i64,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}
