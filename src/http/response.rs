//! Rejection response for rate limited requests.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Unit label reported alongside `retryAfter`.
pub const RETRY_AFTER_UNIT: &str = "milliseconds";

/// JSON payload of a 429 response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitedBody {
    /// Human readable message
    pub message: String,
    /// Advisory wait, in `time_unit`
    pub retry_after: u64,
    /// Unit of `retry_after`
    pub time_unit: String,
}

impl RateLimitedBody {
    pub fn new(retry_after: Duration) -> Self {
        Self {
            message: "Too many requests".to_string(),
            retry_after: ceil_millis(retry_after),
            time_unit: RETRY_AFTER_UNIT.to_string(),
        }
    }
}

/// A rate limit rejection that renders as HTTP 429.
///
/// Besides the JSON body, the standard `Retry-After` header is set in whole
/// seconds, rounded up and never below one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimited {
    pub retry_after: Duration,
}

impl IntoResponse for RateLimited {
    fn into_response(self) -> Response {
        let seconds = ceil_secs(self.retry_after).max(1);
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(RateLimitedBody::new(self.retry_after)),
        )
            .into_response();
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
        response
    }
}

fn ceil_millis(duration: Duration) -> u64 {
    let nanos = duration.as_nanos().div_ceil(1_000_000);
    u64::try_from(nanos).unwrap_or(u64::MAX)
}

fn ceil_secs(duration: Duration) -> u64 {
    if duration.subsec_nanos() > 0 {
        duration.as_secs().saturating_add(1)
    } else {
        duration.as_secs()
    }
}
