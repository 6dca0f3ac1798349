//! Storage subsystem
//!
//! This module provides the persistence interface of the recording pipeline and its
//! SQLite implementation.
//!
//! Components:
//! - `storage_trait`: the Storage trait the recorder and session manager depend on.
//! - `types`: the persisted `TrafficSample`.
//! - `database_storage`: ORM-based SQLite implementation using SeaORM.
//! - `db_entities`: SeaORM entity models for the database backend.

pub mod database_storage;
pub mod db_entities;
pub mod storage_trait;
pub mod types;

pub use database_storage::DatabaseStorage;
pub use storage_trait::Storage;
pub use types::TrafficSample;
