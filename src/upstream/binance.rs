//! Binance public market-data client.

use super::{CandleInterval, EarliestPrice, FetchError, PriceSource, SpotSymbol};
use crate::utils::serialization::{de_f64_flexible, value_as_f64};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error};

pub const DEFAULT_API_URL: &str = "https://api.binance.com/api/v3";

/// Some edges of the public API reject requests without a browser-like agent.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/91.0.4472.124";

/// Only BTC/USDT candles are ever queried.
const CANDLE_SYMBOL: &str = "BTCUSDT";

/// Candle array positions used by the proxy.
const OPEN_TIME_IDX: usize = 0;
const CLOSE_IDX: usize = 4;

#[derive(Debug, Deserialize)]
struct TickerPrice {
    #[serde(deserialize_with = "de_f64_flexible")]
    price: f64,
}

/// [`PriceSource`] backed by the Binance v3 REST API.
#[derive(Debug, Clone)]
pub struct BinanceClient {
    client: Client,
    ticker_url: Url,
    klines_url: Url,
}

impl BinanceClient {
    /// Build a client for the API rooted at `base` (e.g. `https://api.binance.com/api/v3`).
    pub fn new(base: &Url) -> anyhow::Result<Self> {
        let mut base = base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build upstream HTTP client")?;

        Ok(Self {
            client,
            ticker_url: base.join("ticker/price").context("Invalid ticker URL")?,
            klines_url: base.join("klines").context("Invalid klines URL")?,
        })
    }

    async fn get(&self, url: Url) -> Result<Vec<u8>, FetchError> {
        debug!("GET {}", url);

        let resp = self
            .client
            .get(url)
            .header("accept", "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        Ok(resp.bytes().await?.to_vec())
    }

    fn klines(&self, interval: CandleInterval, bound: (&str, i64)) -> Url {
        let mut url = self.klines_url.clone();
        url.query_pairs_mut()
            .append_pair("symbol", CANDLE_SYMBOL)
            .append_pair("interval", interval.as_str())
            .append_pair(bound.0, &bound.1.to_string())
            .append_pair("limit", "1");
        url
    }
}

#[async_trait]
impl PriceSource for BinanceClient {
    async fn spot_price(&self, symbol: SpotSymbol) -> Result<f64, FetchError> {
        let mut url = self.ticker_url.clone();
        url.query_pairs_mut().append_pair("symbol", symbol.as_str());

        let result = match self.get(url).await {
            Ok(body) => decode_ticker(&body),
            Err(e) => Err(e),
        };
        result.inspect_err(|e| error!("Error fetching {} price: {}", symbol, e))
    }

    async fn earliest_price(&self) -> Result<Option<EarliestPrice>, FetchError> {
        let url = self.klines(CandleInterval::Daily, ("startTime", 0));

        let result = match self.get(url).await {
            Ok(body) => decode_first_candle(&body).and_then(|candle| {
                candle
                    .map(|c| -> Result<EarliestPrice, FetchError> {
                        Ok(EarliestPrice {
                            price: candle_close(&c)?,
                            timestamp: candle_open_time(&c)?,
                        })
                    })
                    .transpose()
            }),
            Err(e) => Err(e),
        };
        result.inspect_err(|e| error!("Error fetching earliest price: {}", e))
    }

    async fn historical_price(
        &self,
        period: &str,
        as_of_ms: i64,
    ) -> Result<Option<f64>, FetchError> {
        let url = self.klines(CandleInterval::for_period(period), ("endTime", as_of_ms));

        let result = match self.get(url).await {
            Ok(body) => decode_first_candle(&body)
                .and_then(|candle| candle.map(|c| candle_close(&c)).transpose()),
            Err(e) => Err(e),
        };
        result.inspect_err(|e| error!("Error fetching historical price for {}: {}", period, e))
    }
}

/// Decode a `/ticker/price` body: `{"symbol": "BTCUSDT", "price": "65000.01"}`.
pub(crate) fn decode_ticker(body: &[u8]) -> Result<f64, FetchError> {
    let ticker: TickerPrice = serde_json::from_slice(body)
        .map_err(|e| FetchError::format(format!("ticker: {e}")))?;

    if !ticker.price.is_finite() {
        return Err(FetchError::format(format!(
            "ticker: non-finite price {}",
            ticker.price
        )));
    }
    Ok(ticker.price)
}

/// Decode a `/klines` body and return its first candle, if any.
pub(crate) fn decode_first_candle(body: &[u8]) -> Result<Option<Vec<Value>>, FetchError> {
    let candles: Vec<Value> = serde_json::from_slice(body)
        .map_err(|e| FetchError::format(format!("klines: {e}")))?;

    let Some(first) = candles.into_iter().next() else {
        return Ok(None);
    };

    match first {
        Value::Array(fields) if fields.len() > CLOSE_IDX => Ok(Some(fields)),
        Value::Array(fields) => Err(FetchError::format(format!(
            "klines: candle has {} fields, expected at least {}",
            fields.len(),
            CLOSE_IDX + 1
        ))),
        other => Err(FetchError::format(format!(
            "klines: expected candle array, got: {other}"
        ))),
    }
}

fn candle_close(candle: &[Value]) -> Result<f64, FetchError> {
    let close = value_as_f64(&candle[CLOSE_IDX])
        .map_err(|e| FetchError::format(format!("candle close: {e}")))?;

    if !close.is_finite() {
        return Err(FetchError::format(format!("candle close: non-finite {close}")));
    }
    Ok(close)
}

fn candle_open_time(candle: &[Value]) -> Result<i64, FetchError> {
    candle[OPEN_TIME_IDX]
        .as_i64()
        .ok_or_else(|| FetchError::format(format!("candle open time: {}", candle[OPEN_TIME_IDX])))
}
