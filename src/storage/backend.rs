//! Target store trait definition
//!
//! This module defines the `TargetStore` trait, the only way the scheduler
//! and the HTTP API reach persisted targets and their history.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::StorageResult;
use super::schema::{HistoryRecord, NewTarget, Target, TargetId};

/// Health status of the store
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Is the store operational?
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,

    /// Additional backend-specific metadata
    pub metadata: std::collections::HashMap<String, String>,
}

/// Persistent storage for targets and their fetch history
///
/// Implementations must be `Send + Sync`: the scheduler shares one store
/// between its tick loop and every spawned fetch cycle.
///
/// ## Last check
///
/// `Target::last_check` returned by `list_targets` and `find_target` is the
/// `created_at` of the newest history record. Implementations must not keep
/// a separate column for it.
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// List every target, with `last_check` joined in from history
    ///
    /// Called once per scheduler tick. Results are ordered by id.
    async fn list_targets(&self) -> StorageResult<Vec<Target>>;

    /// Record the result of one completed fetch
    ///
    /// The record's `created_at` is the time of the append. Fails if the
    /// target no longer exists.
    async fn append_history(
        &self,
        target_id: TargetId,
        response: String,
        duration_secs: f64,
    ) -> StorageResult<()>;

    /// Timestamp of the newest history record for a target
    async fn get_last_check(&self, target_id: TargetId) -> StorageResult<Option<DateTime<Utc>>>;

    /// Validate and persist a new target, assigning its id
    async fn create_target(&self, target: NewTarget) -> StorageResult<Target>;

    /// Look up one target, `StorageError::NotFound` if absent
    async fn find_target(&self, id: TargetId) -> StorageResult<Target>;

    /// Delete a target together with its history
    async fn delete_target(&self, id: TargetId) -> StorageResult<()>;

    /// Full history of one target, oldest first
    async fn list_history(&self, id: TargetId) -> StorageResult<Vec<HistoryRecord>>;

    /// Lightweight liveness probe
    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Release connections and flush pending writes
    async fn close(&self) -> StorageResult<()>;
}
