//! # odrlab-store
//!
//! SQLite persistence for the ODR Lab backend.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every domain
//! model.  Multi-step writes (role transitions, submission review, mentor
//! approval) run inside a single transaction so the store never holds partial
//! state.

pub mod audit;
pub mod collab;
pub mod comments;
pub mod database;
pub mod ideas;
pub mod likes;
pub mod migrations;
pub mod models;
pub mod profiles;
pub mod submissions;
pub mod users;

mod error;

#[cfg(test)]
mod testutil;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
