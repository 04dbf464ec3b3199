//! HTTP layer for Roster.
//!
//! Exposes an axum [`Router`] backed by any [`UserStore`]: Clerk webhook
//! ingestion, a user listing and a health check, all behind per-client rate
//! limiting.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/health` | Always 200; reports store reachability |
//! | `GET`  | `/users` | Active users, newest first |
//! | `POST` | `/webhooks/clerk` | Svix-signed Clerk events |

pub mod admission;
pub mod error;
pub mod health;
pub mod rate_limit;
pub mod settings;
pub mod signature;
pub mod users;
pub mod webhooks;

pub use error::ApiError;
pub use settings::ServerConfig;

use std::{future::Future, sync::Arc, time::Duration};

use axum::{
  Router, middleware,
  routing::{get, post},
};
use roster_core::store::UserStore;
use tower_http::trace::TraceLayer;

use admission::Admission;
use rate_limit::RateLimiter;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: UserStore> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the service router.
///
/// `limiter` is consulted for every request before routing; share one
/// instance per process.
pub fn router<S>(state: AppState<S>, limiter: Arc<RateLimiter>) -> Router
where
  S: UserStore + Clone + 'static,
{
  let admission = Admission {
    limiter,
    trust_forwarded_for: state.config.trust_forwarded_for,
  };

  Router::new()
    .route("/health",         get(health::handler::<S>))
    .route("/users",          get(users::list::<S>))
    .route("/webhooks/clerk", post(webhooks::clerk::<S>))
    .with_state(state)
    .layer(middleware::from_fn_with_state(admission, admission::middleware))
    .layer(TraceLayer::new_for_http())
}

/// Run a store call, bounded by the request deadline.
pub(crate) async fn with_deadline<T, E>(
  deadline: Duration,
  call: impl Future<Output = Result<T, E>>,
) -> Result<T, ApiError>
where
  E: std::error::Error + Send + Sync + 'static,
{
  match tokio::time::timeout(deadline, call).await {
    Ok(Ok(value)) => Ok(value),
    Ok(Err(e)) => Err(ApiError::Store(Box::new(e))),
    Err(_elapsed) => Err(ApiError::Timeout),
  }
}

// ─── Integration tests ────────────────────────────────────────────────────────
