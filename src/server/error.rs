use super::types::ErrorBody;
use crate::upstream::FetchError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{error, warn};

/// Errors surfaced to API clients.
///
/// Upstream failures of any kind collapse to a 500 with a fixed per-endpoint
/// message; the cause is only logged.
#[derive(Debug)]
pub enum ApiError {
    Upstream { message: String, source: FetchError },
    BadRequest(String),
}

impl ApiError {
    pub fn upstream(message: impl Into<String>, source: FetchError) -> Self {
        Self::Upstream {
            message: message.into(),
            source,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Upstream { message, source } => {
                error!("{}: {}", message, source);
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
            Self::BadRequest(message) => {
                warn!("{}", message);
                (StatusCode::BAD_REQUEST, message)
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
