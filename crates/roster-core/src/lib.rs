//! Core types and trait definitions for the Roster user directory.
//!
//! This crate has no HTTP or database dependencies.
//! Webhook payloads are parsed and normalised here; persistence is reached
//! only through the [`store::UserStore`] trait.

pub mod error;
pub mod event;
pub mod store;
pub mod user;

pub use error::{Error, Result};
