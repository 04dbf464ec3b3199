//! User records as held by a store, and the normalised input for upserts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Directory role. The first active user to arrive becomes `Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Admin,
  #[default]
  Member,
}

/// A row of the `users` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id:         i64,
  /// The identity provider's stable subject id.
  pub clerk_id:   String,
  pub name:       String,
  pub email:      Option<String>,
  pub username:   Option<String>,
  pub role:       Role,
  pub is_active:  bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  /// Set when the user was soft-deleted; cleared on reactivation.
  pub deleted_at: Option<DateTime<Utc>>,
}

/// Normalised fields for [`UserStore::upsert_with_role`].
///
/// `username` and `email` are `None` when the provider sent nothing usable;
/// stores must keep any previously stored value in that case.
///
/// [`UserStore::upsert_with_role`]: crate::store::UserStore::upsert_with_role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertUser {
  pub clerk_id: String,
  pub username: Option<String>,
  pub name:     String,
  pub email:    Option<String>,
}

/// Trim `s`, mapping an empty result to `None`.
pub fn non_blank(s: &str) -> Option<String> {
  let s = s.trim();
  (!s.is_empty()).then(|| s.to_owned())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn non_blank_trims_and_drops_empty() {
    assert_eq!(non_blank("  jo "), Some("jo".to_owned()));
    assert_eq!(non_blank("   "), None);
    assert_eq!(non_blank(""), None);
  }

  #[test]
  fn role_serialises_lowercase() {
    assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    assert_eq!(serde_json::to_string(&Role::Member).unwrap(), "\"member\"");
  }
}
