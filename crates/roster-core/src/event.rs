//! Clerk webhook events and the normalisation applied before they reach a
//! store.
//!
//! Parsing is a tolerant reader: unknown fields are ignored, and missing or
//! `null` fields degrade to empty values instead of failing. Only payloads
//! that are not JSON, or whose fields have the wrong type, are rejected.

use serde::{Deserialize, Deserializer};

use crate::{
  Result,
  user::{UpsertUser, non_blank},
};

/// Display name used when the provider sent neither a name nor a username.
pub const FALLBACK_DISPLAY_NAME: &str = "User";

// ─── Event kind ──────────────────────────────────────────────────────────────

/// The event types this service acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
  UserCreated,
  UserUpdated,
  UserDeleted,
  /// Any other tag. Accepted and acknowledged, never applied.
  Other,
}

impl EventKind {
  pub fn from_tag(tag: &str) -> Self {
    match tag {
      "user.created" => Self::UserCreated,
      "user.updated" => Self::UserUpdated,
      "user.deleted" => Self::UserDeleted,
      _ => Self::Other,
    }
  }
}

// ─── Payload ─────────────────────────────────────────────────────────────────

/// One entry of `data.email_addresses`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EmailAddress {
  #[serde(deserialize_with = "null_as_default")]
  pub id:            String,
  #[serde(deserialize_with = "null_as_default")]
  pub email_address: String,
}

/// The `data` object of a `user.*` event.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserData {
  #[serde(deserialize_with = "null_as_default")]
  pub id:                       String,
  #[serde(deserialize_with = "null_as_default")]
  pub username:                 String,
  #[serde(deserialize_with = "null_as_default")]
  pub first_name:               String,
  #[serde(deserialize_with = "null_as_default")]
  pub last_name:                String,
  #[serde(deserialize_with = "null_as_default")]
  pub primary_email_address_id: String,
  #[serde(deserialize_with = "null_as_default")]
  pub email_addresses:          Vec<EmailAddress>,
}

/// A webhook event as delivered by the identity provider.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WebhookEvent {
  /// The raw type tag, echoed back in acknowledgements.
  #[serde(rename = "type", deserialize_with = "null_as_default")]
  pub event_type: String,
  #[serde(deserialize_with = "null_as_default")]
  pub data:       UserData,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl WebhookEvent {
  /// Parse a (verified) request body. A bare `null` is an empty event.
  pub fn from_slice(body: &[u8]) -> Result<Self> {
    let event: Option<Self> = serde_json::from_slice(body)?;
    Ok(event.unwrap_or_default())
  }

  pub fn kind(&self) -> EventKind { EventKind::from_tag(&self.event_type) }

  /// The trimmed subject id, or `None` if it is blank.
  pub fn subject_id(&self) -> Option<&str> {
    let id = self.data.id.trim();
    (!id.is_empty()).then_some(id)
  }

  pub fn display_name(&self) -> String {
    display_name(&self.data.first_name, &self.data.last_name, &self.data.username)
  }

  pub fn primary_email(&self) -> String {
    select_email(&self.data.primary_email_address_id, &self.data.email_addresses)
  }

  /// Normalised upsert input, or `None` when the event carries no subject.
  pub fn to_upsert(&self) -> Option<UpsertUser> {
    let clerk_id = self.subject_id()?;
    Some(UpsertUser {
      clerk_id: clerk_id.to_owned(),
      username: non_blank(&self.data.username),
      name:     self.display_name(),
      email:    non_blank(&self.primary_email()),
    })
  }
}

// ─── Normalisation ───────────────────────────────────────────────────────────

/// `first last`, else the username, else [`FALLBACK_DISPLAY_NAME`]. Never
/// empty.
pub fn display_name(first: &str, last: &str, username: &str) -> String {
  let full = format!("{first} {last}");
  let full = full.trim();
  if !full.is_empty() {
    return full.to_owned();
  }
  let username = username.trim();
  if !username.is_empty() {
    return username.to_owned();
  }
  FALLBACK_DISPLAY_NAME.to_owned()
}

/// Pick the address to store for a user.
///
/// The candidate referenced by `primary_id` wins if it has a non-blank
/// address; otherwise the first non-blank candidate in order. The result is
/// trimmed and lower-cased; an empty string means no usable address.
pub fn select_email(primary_id: &str, candidates: &[EmailAddress]) -> String {
  let usable = |c: &&EmailAddress| !c.email_address.trim().is_empty();

  let primary = if primary_id.is_empty() {
    None
  } else {
    candidates.iter().filter(usable).find(|c| c.id == primary_id)
  };

  primary
    .or_else(|| candidates.iter().find(usable))
    .map(|c| c.email_address.trim().to_lowercase())
    .unwrap_or_default()
}
