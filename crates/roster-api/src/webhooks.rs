//! Handler for `POST /webhooks/clerk`.
//!
//! Order matters: the signature is checked against the raw bytes before the
//! body is parsed, and nothing touches the store until both have passed.
//!
//! | Outcome | Status |
//! |---------|--------|
//! | body unreadable / not JSON | 400 |
//! | signature missing or wrong | 401 |
//! | applied, ignored, or unknown type | 200 + [`WebhookAck`] |
//! | store failure | 500 |
//! | store call exceeded the deadline | 503 |

use axum::{
  Json,
  extract::{State, rejection::BytesRejection},
  http::HeaderMap,
};
use bytes::Bytes;
use roster_core::{
  event::{EventKind, WebhookEvent},
  store::UserStore,
};
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiError, signature, with_deadline};

pub const SVIX_ID: &str = "svix-id";
pub const SVIX_TIMESTAMP: &str = "svix-timestamp";
pub const SVIX_SIGNATURE: &str = "svix-signature";

/// Reason reported when a `user.*` event has no subject id.
pub const MISSING_ID: &str = "missing id";

/// Body returned for every accepted delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAck {
  pub ok:         bool,
  #[serde(rename = "type")]
  pub event_type: String,
  /// Why the event had no effect, if it was structurally valid but not
  /// actionable.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ignored:    Option<String>,
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
  headers
    .get(name)
    .and_then(|v| v.to_str().ok())
    .unwrap_or_default()
}

/// `POST /webhooks/clerk`
pub async fn clerk<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  body: Result<Bytes, BytesRejection>,
) -> Result<Json<WebhookAck>, ApiError>
where
  S: UserStore,
{
  let body = body.map_err(|e| ApiError::BadRequest(format!("unreadable body: {e}")))?;

  let delivery = header(&headers, SVIX_ID);
  if !signature::verify(
    &body,
    &state.config.clerk_webhook_secret,
    delivery,
    header(&headers, SVIX_TIMESTAMP),
    header(&headers, SVIX_SIGNATURE),
  ) {
    tracing::warn!(%delivery, "rejected webhook with invalid signature");
    return Err(ApiError::Unauthorized);
  }

  let event =
    WebhookEvent::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

  let ignored = dispatch(&state, &event).await?;
  Ok(Json(WebhookAck {
    ok:         true,
    event_type: event.event_type,
    ignored:    ignored.map(str::to_owned),
  }))
}

/// Apply `event` to the store. Returns the reason it was ignored, if it was.
async fn dispatch<S>(
  state: &AppState<S>,
  event: &WebhookEvent,
) -> Result<Option<&'static str>, ApiError>
where
  S: UserStore,
{
  let deadline = state.config.request_timeout();

  match event.kind() {
    EventKind::UserCreated | EventKind::UserUpdated => {
      let Some(input) = event.to_upsert() else {
        tracing::debug!(event_type = %event.event_type, "ignoring event without subject id");
        return Ok(Some(MISSING_ID));
      };
      let user = with_deadline(deadline, state.store.upsert_with_role(input)).await?;
      tracing::info!(
        event_type = %event.event_type,
        clerk_id = %user.clerk_id,
        role = ?user.role,
        "user upserted"
      );
    }
    EventKind::UserDeleted => {
      let Some(clerk_id) = event.subject_id() else {
        tracing::debug!(event_type = %event.event_type, "ignoring event without subject id");
        return Ok(Some(MISSING_ID));
      };
      let found = with_deadline(deadline, state.store.soft_delete(clerk_id.to_owned())).await?;
      if found {
        tracing::info!(%clerk_id, "user soft-deleted");
      } else {
        tracing::debug!(%clerk_id, "delete for unknown user");
      }
    }
    EventKind::Other => {
      tracing::debug!(event_type = %event.event_type, "ignoring unhandled event type");
    }
  }

  Ok(None)
}
