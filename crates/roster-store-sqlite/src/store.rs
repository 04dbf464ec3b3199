//! [`SqliteStore`], the SQLite implementation of [`UserStore`].

use std::path::Path;

use chrono::Utc;
use roster_core::{
  store::UserStore,
  user::{Role, UpsertUser, User},
};

use crate::{
  Result,
  encode::{RawUser, USER_COLUMNS, encode_dt, encode_role},
  schema::{MIGRATIONS, PRAGMAS},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Roster user store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and apply pending migrations.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.migrate().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.migrate().await?;
    Ok(store)
  }

  /// The number of migrations applied to this database.
  pub async fn schema_version(&self) -> Result<u32> {
    let version = self
      .conn
      .call(|conn| Ok(conn.query_row("PRAGMA user_version", [], |r| r.get(0))?))
      .await?;
    Ok(version)
  }

  /// Fetch a row regardless of `is_active`.
  #[cfg(test)]
  pub(crate) async fn find_any(&self, clerk_id: &str) -> Result<Option<User>> {
    use rusqlite::OptionalExtension as _;

    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE clerk_id = ?1");
    let clerk_id = clerk_id.to_owned();
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![clerk_id], RawUser::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn migrate(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(PRAGMAS)?;

        let current: u32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
        let tx = conn.transaction()?;
        for (idx, sql) in MIGRATIONS.iter().enumerate().skip(current as usize) {
          tx.execute_batch(sql)?;
          tx.pragma_update(None, "user_version", idx as u32 + 1)?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── UserStore impl ──────────────────────────────────────────────────────────

impl UserStore for SqliteStore {
  type Error = crate::Error;

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn upsert_with_role(&self, input: UpsertUser) -> Result<User> {
    let now = encode_dt(Utc::now());

    // One statement: the role sub-select and the write are atomic.
    let sql = format!(
      "INSERT INTO users (clerk_id, username, name, email, role, is_active, created_at, updated_at)
       VALUES (
         ?1, ?2, ?3, ?4,
         CASE WHEN EXISTS (SELECT 1 FROM users WHERE is_active = 1)
              THEN ?6 ELSE ?7 END,
         1, ?5, ?5
       )
       ON CONFLICT (clerk_id) DO UPDATE SET
         username   = COALESCE(excluded.username, users.username),
         name       = excluded.name,
         email      = COALESCE(excluded.email, users.email),
         is_active  = 1,
         deleted_at = NULL,
         updated_at = excluded.updated_at
       RETURNING {USER_COLUMNS}"
    );

    let raw: RawUser = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &sql,
          rusqlite::params![
            input.clerk_id,
            input.username,
            input.name,
            input.email,
            now,
            encode_role(Role::Member),
            encode_role(Role::Admin),
          ],
          RawUser::from_row,
        )?)
      })
      .await?;

    raw.into_user()
  }

  async fn soft_delete(&self, clerk_id: String) -> Result<bool> {
    let now = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users
           SET is_active  = 0,
               deleted_at = COALESCE(deleted_at, ?2),
               updated_at = ?2
           WHERE clerk_id = ?1",
          rusqlite::params![clerk_id, now],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn purge(&self, clerk_id: String) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM users WHERE clerk_id = ?1",
          rusqlite::params![clerk_id],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn list_users(&self) -> Result<Vec<User>> {
    let sql = format!(
      "SELECT {USER_COLUMNS} FROM users
       WHERE is_active = 1
       ORDER BY created_at DESC, id DESC"
    );

    let raws: Vec<RawUser> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn health_check(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.query_row("SELECT 1", [], |r| r.get::<_, i64>(0))?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
