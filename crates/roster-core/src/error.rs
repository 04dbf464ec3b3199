//! Error types for `roster-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid webhook payload: {0}")]
  InvalidPayload(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
