//! Public HTTP API in front of the freshness cache.

mod error;
pub mod handlers;
pub mod types;

pub use error::ApiError;

use crate::cache::FreshnessCache;
use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<FreshnessCache>,
}

/// Routes of the price API, without middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/prices", get(handlers::prices))
        .route("/api/earliest-price", get(handlers::earliest_price))
        .route("/api/historical-price", get(handlers::historical_price))
        .with_state(state)
}

/// CORS for the calculator front end: GET only, from the listed origins.
/// A `*` entry allows any origin.
pub fn cors_layer(allowed_origins: &[String]) -> anyhow::Result<CorsLayer> {
    let allow_origin = if allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins = allowed_origins
            .iter()
            .map(|o| {
                HeaderValue::from_str(o).with_context(|| format!("Invalid CORS origin: {}", o))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        AllowOrigin::list(origins)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]))
}
