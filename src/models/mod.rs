//! Core data models for the archive service.
//!
//! `archive` maps to SQLite tables via `sqlx::FromRow`; `stored_object`
//! describes objects held in the remote store.

pub mod archive;
pub mod stored_object;
