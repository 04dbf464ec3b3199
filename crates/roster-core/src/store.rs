//! The `UserStore` trait.
//!
//! Implemented by storage backends (e.g. `roster-store-sqlite`). The HTTP
//! layer depends on this abstraction only, and hands it fields that have
//! already been normalised (see [`crate::event`]).

use std::future::Future;

use crate::user::{UpsertUser, User};

/// Abstraction over the persistence of the `users` collection.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait UserStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Create or update the user identified by `input.clerk_id`, atomically.
  ///
  /// - A new user becomes [`Role::Admin`] only if no active user exists yet;
  ///   otherwise [`Role::Member`]. An existing user's role is never changed.
  /// - A soft-deleted user with the same id is reactivated and its deletion
  ///   marker cleared.
  /// - `None` for `username`/`email` keeps the stored value.
  ///
  /// Repeating the call with the same input is a no-op beyond `updated_at`.
  ///
  /// [`Role::Admin`]: crate::user::Role::Admin
  /// [`Role::Member`]: crate::user::Role::Member
  fn upsert_with_role(
    &self,
    input: UpsertUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Mark the user inactive and stamp its deletion time. The row is kept.
  ///
  /// Returns `false` if no user has this id; that is not an error. Deleting
  /// an already-deleted user keeps the original deletion time.
  fn soft_delete(
    &self,
    clerk_id: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Physically remove the user row. Returns `false` if nothing matched.
  fn purge(
    &self,
    clerk_id: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// All active users, newest first.
  fn list_users(&self) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  /// Cheap connectivity probe.
  fn health_check(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
