//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler or the admission layer.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("rate limit exceeded")]
  RateLimited,

  #[error("invalid webhook signature")]
  Unauthorized,

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("request timed out")]
  Timeout,

  /// Details are logged, never sent to the caller.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
      ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Timeout => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store operation failed");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          "internal server error".to_owned(),
        )
      }
    };

    let mut res = (status, Json(json!({ "error": message }))).into_response();
    if matches!(self, ApiError::RateLimited) {
      res
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
    }
    res
  }
}
