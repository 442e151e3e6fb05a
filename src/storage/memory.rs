//! In-memory target store (no persistence)
//!
//! Used when the storage backend is configured as `none`, and as the store
//! behind most scheduler tests.
//!
//! ## Limitations
//!
//! - **No persistence**: All targets and history are lost on restart
//! - **Unbounded history**: Nothing is ever evicted

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use super::backend::{HealthStatus, TargetStore};
use super::error::{StorageError, StorageResult};
use super::schema::{HistoryRecord, NewTarget, Target, TargetId};

#[derive(Debug, Clone)]
struct StoredTarget {
    url: String,
    interval_secs: u32,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: TargetId,

    /// Targets ordered by id
    targets: BTreeMap<TargetId, StoredTarget>,

    /// History grouped by target, oldest first
    history: HashMap<TargetId, Vec<HistoryRecord>>,
}

impl MemoryState {
    fn last_check(&self, id: TargetId) -> Option<DateTime<Utc>> {
        self.history
            .get(&id)
            .and_then(|records| records.iter().map(|r| r.created_at).max())
    }

    fn to_target(&self, id: TargetId, stored: &StoredTarget) -> Target {
        Target {
            id,
            url: stored.url.clone(),
            interval_secs: stored.interval_secs,
            last_check: self.last_check(id),
        }
    }
}

/// In-memory target store
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    /// Create a new, empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TargetStore for MemoryStore {
    async fn list_targets(&self) -> StorageResult<Vec<Target>> {
        let state = self.state.read().await;

        Ok(state
            .targets
            .iter()
            .map(|(id, stored)| state.to_target(*id, stored))
            .collect())
    }

    async fn append_history(
        &self,
        target_id: TargetId,
        response: String,
        duration_secs: f64,
    ) -> StorageResult<()> {
        let mut state = self.state.write().await;

        if !state.targets.contains_key(&target_id) {
            return Err(StorageError::NotFound(target_id));
        }

        debug!("appending history for target {target_id}");

        state.history.entry(target_id).or_default().push(HistoryRecord {
            target_id,
            response,
            duration_secs,
            created_at: Utc::now(),
        });

        Ok(())
    }

    async fn get_last_check(&self, target_id: TargetId) -> StorageResult<Option<DateTime<Utc>>> {
        let state = self.state.read().await;
        Ok(state.last_check(target_id))
    }

    async fn create_target(&self, target: NewTarget) -> StorageResult<Target> {
        target.validate()?;

        let mut state = self.state.write().await;
        state.next_id += 1;
        let id = state.next_id;

        state.targets.insert(
            id,
            StoredTarget {
                url: target.url.clone(),
                interval_secs: target.interval_secs,
            },
        );

        Ok(Target {
            id,
            url: target.url,
            interval_secs: target.interval_secs,
            last_check: None,
        })
    }

    async fn find_target(&self, id: TargetId) -> StorageResult<Target> {
        let state = self.state.read().await;

        state
            .targets
            .get(&id)
            .map(|stored| state.to_target(id, stored))
            .ok_or(StorageError::NotFound(id))
    }

    async fn delete_target(&self, id: TargetId) -> StorageResult<()> {
        let mut state = self.state.write().await;

        if state.targets.remove(&id).is_none() {
            return Err(StorageError::NotFound(id));
        }
        state.history.remove(&id);

        Ok(())
    }

    async fn list_history(&self, id: TargetId) -> StorageResult<Vec<HistoryRecord>> {
        let state = self.state.read().await;

        if !state.targets.contains_key(&id) {
            return Err(StorageError::NotFound(id));
        }

        Ok(state.history.get(&id).cloned().unwrap_or_default())
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let state = self.state.read().await;
        let history_count: usize = state.history.values().map(Vec::len).sum();

        Ok(HealthStatus {
            healthy: true,
            message: "In-memory storage operational".to_string(),
            metadata: HashMap::from([
                ("backend".to_string(), "memory".to_string()),
                ("targets".to_string(), state.targets.len().to_string()),
                ("history_records".to_string(), history_count.to_string()),
            ]),
        })
    }

    async fn close(&self) -> StorageResult<()> {
        debug!("closing in-memory store (no-op)");
        Ok(())
    }
}
