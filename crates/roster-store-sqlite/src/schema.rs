//! SQL schema for the Roster SQLite store.
//!
//! The schema is a sequence of migrations. `PRAGMA user_version` records how
//! many have been applied; opening a store applies the rest in order, inside
//! one transaction.

/// Connection-level settings, executed on every open.
pub const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
";

/// Migrations in application order. Entry `n` moves the schema from version
/// `n` to `n + 1`. Never edit an entry once released; append a new one.
pub const MIGRATIONS: &[&str] = &[
  // 1: base table
  "
CREATE TABLE IF NOT EXISTS users (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    clerk_id  TEXT NOT NULL UNIQUE,
    name      TEXT NOT NULL,
    email     TEXT,
    username  TEXT
);
",
  // 2: audit columns
  "
ALTER TABLE users ADD COLUMN created_at TEXT NOT NULL DEFAULT '';
ALTER TABLE users ADD COLUMN updated_at TEXT NOT NULL DEFAULT '';
UPDATE users SET created_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE created_at = '';
UPDATE users SET updated_at = created_at WHERE updated_at = '';
",
  // 3: role
  "
ALTER TABLE users ADD COLUMN role TEXT NOT NULL DEFAULT 'member';  -- 'admin' | 'member'
",
  // 4: soft delete
  "
ALTER TABLE users ADD COLUMN is_active  INTEGER NOT NULL DEFAULT 1;
ALTER TABLE users ADD COLUMN deleted_at TEXT;
CREATE INDEX IF NOT EXISTS users_active_created_idx ON users(is_active, created_at);
",
];

/// The version a fully migrated database reports.
pub const SCHEMA_VERSION: u32 = MIGRATIONS.len() as u32;
