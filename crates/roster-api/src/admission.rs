//! Admission layer: per-client rate limiting in front of every route.

use std::{net::SocketAddr, sync::Arc};

use axum::{
  extract::{ConnectInfo, Request, State},
  middleware::Next,
  response::Response,
};

use crate::{error::ApiError, rate_limit::RateLimiter};

/// Identity used when the peer address is unknown.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// State for [`middleware`].
#[derive(Clone)]
pub struct Admission {
  pub limiter:             Arc<RateLimiter>,
  pub trust_forwarded_for: bool,
}

/// Reject over-limit requests with 429 before they reach a handler.
pub async fn middleware(
  State(admission): State<Admission>,
  req: Request,
  next: Next,
) -> Result<Response, ApiError> {
  let client = client_identity(&req, admission.trust_forwarded_for);
  if !admission.limiter.admit(&client) {
    tracing::warn!(%client, path = %req.uri().path(), "rate limit exceeded");
    return Err(ApiError::RateLimited);
  }
  Ok(next.run(req).await)
}

/// The key a request is rate-limited under: the peer IP, or the first
/// `X-Forwarded-For` hop when that header is trusted.
pub fn client_identity(req: &Request, trust_forwarded_for: bool) -> String {
  if trust_forwarded_for
    && let Some(forwarded) = req
      .headers()
      .get("x-forwarded-for")
      .and_then(|v| v.to_str().ok())
      .and_then(|v| v.split(',').next())
      .map(str::trim)
      .filter(|v| !v.is_empty())
  {
    return forwarded.to_owned();
  }

  req
    .extensions()
    .get::<ConnectInfo<SocketAddr>>()
    .map(|ConnectInfo(addr)| addr.ip().to_string())
    .unwrap_or_else(|| UNKNOWN_CLIENT.to_owned())
}
