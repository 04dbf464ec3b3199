//! Handler for `GET /users`.

use axum::{Json, extract::State};
use roster_core::{store::UserStore, user::User};

use crate::{AppState, error::ApiError, with_deadline};

/// `GET /users`: active users, newest first. Always a JSON array.
pub async fn list<S>(State(state): State<AppState<S>>) -> Result<Json<Vec<User>>, ApiError>
where
  S: UserStore,
{
  let users = with_deadline(state.config.request_timeout(), state.store.list_users()).await?;
  Ok(Json(users))
}
