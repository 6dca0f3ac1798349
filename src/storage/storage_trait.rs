//! Storage Trait
//!
//! This module defines the `Storage` trait, the interface between the recording
//! pipeline and whatever persistent store holds traffic history.
//!
//! Implementors of this trait are responsible for:
//! - Appending traffic samples
//! - Reading a subject's samples back, newest first
//! - Answering whether a name belongs to a registered user
//!
//! Every call is independent: no transaction spans several calls and an
//! implementation must not hold a connection between them.

use async_trait::async_trait;

use crate::error_handling::types::StorageError;
use crate::storage::types::TrafficSample;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Appends one sample.
    async fn insert_traffic_sample(&self, sample: &TrafficSample) -> Result<(), StorageError>;

    /// Returns at most `limit` samples of `subject_name`, ordered by `captured_at`
    /// descending. Samples sharing a timestamp come back most recently inserted first.
    async fn query_traffic(
        &self,
        subject_name: &str,
        limit: u64,
    ) -> Result<Vec<TrafficSample>, StorageError>;

    /// Whether `name` is a registered user.
    async fn user_exists(&self, name: &str) -> Result<bool, StorageError>;
}
