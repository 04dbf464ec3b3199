//! Handler for `GET /health`.
//!
//! Always 200: a failing or slow store is reported as `degraded` in the body.

use axum::{Json, extract::State};
use roster_core::store::UserStore;
use serde::Serialize;

use crate::{AppState, with_deadline};

#[derive(Debug, Serialize)]
pub struct Health {
  pub status: &'static str,
  pub db:     &'static str,
}

/// `GET /health`
pub async fn handler<S>(State(state): State<AppState<S>>) -> Json<Health>
where
  S: UserStore,
{
  match with_deadline(state.config.request_timeout(), state.store.health_check()).await {
    Ok(()) => Json(Health { status: "ok", db: "up" }),
    Err(e) => {
      tracing::warn!(error = %e, "health check failed");
      Json(Health { status: "degraded", db: "down" })
    }
  }
}
