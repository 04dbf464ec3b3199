//! Integration tests for `SqliteStore` against an in-memory database.

use roster_core::{
  store::UserStore,
  user::{Role, UpsertUser},
};

use crate::{SCHEMA_VERSION, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn upsert(clerk_id: &str, name: &str, email: Option<&str>) -> UpsertUser {
  UpsertUser {
    clerk_id: clerk_id.into(),
    username: None,
    name:     name.into(),
    email:    email.map(Into::into),
  }
}

// ─── Schema ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn open_applies_all_migrations() {
  let s = store().await;
  assert_eq!(s.schema_version().await.unwrap(), SCHEMA_VERSION);
  s.health_check().await.unwrap();
}

#[tokio::test]
async fn reopening_a_file_is_idempotent() {
  let path = std::env::temp_dir().join(format!("roster-reopen-{}.db", std::process::id()));
  let _ = std::fs::remove_file(&path);

  let s = SqliteStore::open(&path).await.unwrap();
  s.upsert_with_role(upsert("u_1", "Ada", None)).await.unwrap();
  drop(s);

  let s = SqliteStore::open(&path).await.unwrap();
  assert_eq!(s.schema_version().await.unwrap(), SCHEMA_VERSION);
  assert_eq!(s.list_users().await.unwrap().len(), 1);

  drop(s);
  let _ = std::fs::remove_file(&path);
}

// ─── Upsert ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn first_user_is_admin_later_users_are_members() {
  let s = store().await;

  let first = s.upsert_with_role(upsert("u_1", "Ada", None)).await.unwrap();
  let second = s.upsert_with_role(upsert("u_2", "Grace", None)).await.unwrap();

  assert_eq!(first.role, Role::Admin);
  assert_eq!(second.role, Role::Member);
  assert!(first.is_active && second.is_active);
}

#[tokio::test]
async fn repeated_upsert_is_idempotent_and_keeps_roles() {
  let s = store().await;

  s.upsert_with_role(upsert("u_1", "Ada", None)).await.unwrap();
  let once = s.upsert_with_role(upsert("u_2", "Grace", None)).await.unwrap();
  let twice = s.upsert_with_role(upsert("u_2", "Grace", None)).await.unwrap();
  let admin_again = s.upsert_with_role(upsert("u_1", "Ada", None)).await.unwrap();

  assert_eq!(once.id, twice.id);
  assert_eq!(twice.role, Role::Member);
  assert_eq!(admin_again.role, Role::Admin);
  assert_eq!(s.list_users().await.unwrap().len(), 2);
}

#[tokio::test]
async fn update_overwrites_name_but_keeps_email_when_none() {
  let s = store().await;

  s.upsert_with_role(UpsertUser {
    clerk_id: "u_1".into(),
    username: Some("ada".into()),
    name:     "Ada".into(),
    email:    Some("ada@example.com".into()),
  })
  .await
  .unwrap();

  let updated = s
    .upsert_with_role(upsert("u_1", "Ada Lovelace", None))
    .await
    .unwrap();

  assert_eq!(updated.name, "Ada Lovelace");
  assert_eq!(updated.email.as_deref(), Some("ada@example.com"));
  assert_eq!(updated.username.as_deref(), Some("ada"));

  let replaced = s
    .upsert_with_role(upsert("u_1", "Ada Lovelace", Some("ada@new.example.com")))
    .await
    .unwrap();
  assert_eq!(replaced.email.as_deref(), Some("ada@new.example.com"));
}

// ─── Soft delete ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn soft_delete_hides_user_but_keeps_row() {
  let s = store().await;
  s.upsert_with_role(upsert("u_1", "Ada", None)).await.unwrap();

  assert!(s.soft_delete("u_1".into()).await.unwrap());
  assert!(s.list_users().await.unwrap().is_empty());

  // Row still exists: purge finds it.
  assert!(s.purge("u_1".into()).await.unwrap());
}

#[tokio::test]
async fn soft_delete_unknown_subject_is_not_an_error() {
  let s = store().await;
  assert!(!s.soft_delete("nobody".into()).await.unwrap());
}

#[tokio::test]
async fn repeated_soft_delete_then_reactivate() {
  let s = store().await;
  s.upsert_with_role(upsert("u_1", "Ada", None)).await.unwrap();
  s.upsert_with_role(upsert("u_2", "Grace", None)).await.unwrap();

  s.soft_delete("u_2".into()).await.unwrap();
  s.soft_delete("u_2".into()).await.unwrap();

  // Reactivate and check the marker is cleared.
  let back = s.upsert_with_role(upsert("u_2", "Grace", None)).await.unwrap();
  assert!(back.is_active);
  assert!(back.deleted_at.is_none());
  assert_eq!(back.role, Role::Member);
}

#[tokio::test]
async fn repeated_soft_delete_keeps_first_deletion_time() {
  let s = store().await;
  s.upsert_with_role(upsert("u_1", "Ada", None)).await.unwrap();

  s.soft_delete("u_1".into()).await.unwrap();
  let first = s.find_any("u_1").await.unwrap().unwrap();
  assert!(!first.is_active);
  let deleted_at = first.deleted_at.expect("deletion stamped");

  tokio::time::sleep(std::time::Duration::from_millis(5)).await;
  assert!(s.soft_delete("u_1".into()).await.unwrap());

  let again = s.find_any("u_1").await.unwrap().unwrap();
  assert_eq!(again.deleted_at, Some(deleted_at));
  assert!(again.updated_at > first.updated_at);
}

#[tokio::test]
async fn newcomer_after_everyone_left_is_admin() {
  let s = store().await;
  s.upsert_with_role(upsert("u_1", "Ada", None)).await.unwrap();
  s.soft_delete("u_1".into()).await.unwrap();

  let next = s.upsert_with_role(upsert("u_2", "Grace", None)).await.unwrap();
  assert_eq!(next.role, Role::Admin);
}

#[tokio::test]
async fn reactivated_admin_keeps_role() {
  let s = store().await;
  s.upsert_with_role(upsert("u_1", "Ada", None)).await.unwrap();
  s.soft_delete("u_1".into()).await.unwrap();

  let back = s.upsert_with_role(upsert("u_1", "Ada", None)).await.unwrap();
  assert_eq!(back.role, Role::Admin);
}

// ─── Purge ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn purge_removes_row() {
  let s = store().await;
  let first = s.upsert_with_role(upsert("u_1", "Ada", None)).await.unwrap();

  assert!(s.purge("u_1".into()).await.unwrap());
  assert!(!s.purge("u_1".into()).await.unwrap());

  // A fresh row for the same subject gets a new id.
  let again = s.upsert_with_role(upsert("u_1", "Ada", None)).await.unwrap();
  assert_ne!(again.id, first.id);
}

// ─── List ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_is_newest_first() {
  let s = store().await;
  s.upsert_with_role(upsert("u_1", "Ada", None)).await.unwrap();
  s.upsert_with_role(upsert("u_2", "Grace", None)).await.unwrap();
  s.upsert_with_role(upsert("u_3", "Katherine", None)).await.unwrap();

  let ids: Vec<_> = s
    .list_users()
    .await
    .unwrap()
    .into_iter()
    .map(|u| u.clerk_id)
    .collect();
  assert_eq!(ids, ["u_3", "u_2", "u_1"]);
}

#[tokio::test]
async fn list_empty_store() {
  let s = store().await;
  assert!(s.list_users().await.unwrap().is_empty());
}
