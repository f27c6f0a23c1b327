//! HTTP request handlers.

use super::error::ApiError;
use super::types::{EarliestPriceResponse, HistoricalPriceResponse, HistoricalQuery, PricesResponse};
use super::AppState;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use tracing::debug;

/// GET /api/prices - Current BTC/USDT and USDT/BRL prices.
pub async fn prices(State(state): State<AppState>) -> Result<Json<PricesResponse>, ApiError> {
    let prices = state
        .cache
        .current_prices()
        .await
        .map_err(|e| ApiError::upstream("Failed to fetch prices", e))?;

    Ok(Json(prices.into()))
}

/// GET /api/earliest-price - Oldest known BTC price and its candle open time.
pub async fn earliest_price(
    State(state): State<AppState>,
) -> Result<Json<EarliestPriceResponse>, ApiError> {
    let earliest = state
        .cache
        .earliest_price()
        .await
        .map_err(|e| ApiError::upstream("Failed to fetch earliest price", e))?;

    Ok(Json(earliest.into()))
}

/// GET /api/historical-price?period=<P>&timestamp=<ms> - BTC price as of a past time.
pub async fn historical_price(
    State(state): State<AppState>,
    query: Result<Query<HistoricalQuery>, QueryRejection>,
) -> Result<Json<HistoricalPriceResponse>, ApiError> {
    let Query(query) = query.map_err(|rejection| {
        debug!("rejected historical price query: {}", rejection.body_text());
        ApiError::BadRequest("Invalid historical price query".to_string())
    })?;

    let price = state
        .cache
        .historical_price(&query.period, query.timestamp)
        .await
        .map_err(|e| {
            ApiError::upstream(
                format!("Failed to fetch historical price for {}", query.period),
                e,
            )
        })?;

    Ok(Json(HistoricalPriceResponse { price }))
}
