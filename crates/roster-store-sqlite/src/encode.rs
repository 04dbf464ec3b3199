//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 UTC strings with microsecond precision,
//! so lexical order matches chronological order.

use chrono::{DateTime, SecondsFormat, Utc};
use roster_core::user::{Role, User};

use crate::{Error, Result};

/// Column list matching the field order of [`RawUser::from_row`].
pub const USER_COLUMNS: &str =
  "id, clerk_id, name, email, username, role, is_active, created_at, updated_at, deleted_at";

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Role ────────────────────────────────────────────────────────────────────

pub fn encode_role(r: Role) -> &'static str {
  match r {
    Role::Admin => "admin",
    Role::Member => "member",
  }
}

pub fn decode_role(s: &str) -> Result<Role> {
  match s {
    "admin" => Ok(Role::Admin),
    "member" => Ok(Role::Member),
    other => Err(Error::UnknownRole(other.to_owned())),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub id:         i64,
  pub clerk_id:   String,
  pub name:       String,
  pub email:      Option<String>,
  pub username:   Option<String>,
  pub role:       String,
  pub is_active:  bool,
  pub created_at: String,
  pub updated_at: String,
  pub deleted_at: Option<String>,
}

impl RawUser {
  /// Read a row selected with [`USER_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawUser {
      id:         row.get(0)?,
      clerk_id:   row.get(1)?,
      name:       row.get(2)?,
      email:      row.get(3)?,
      username:   row.get(4)?,
      role:       row.get(5)?,
      is_active:  row.get(6)?,
      created_at: row.get(7)?,
      updated_at: row.get(8)?,
      deleted_at: row.get(9)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:         self.id,
      clerk_id:   self.clerk_id,
      name:       self.name,
      email:      self.email,
      username:   self.username,
      role:       decode_role(&self.role)?,
      is_active:  self.is_active,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
      deleted_at: self.deleted_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}
