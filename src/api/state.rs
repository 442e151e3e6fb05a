//! API shared state

use std::sync::Arc;

use crate::scheduler::SchedulerHandle;
use crate::storage::TargetStore;

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Store shared with the scheduler
    pub store: Arc<dyn TargetStore>,

    /// Running scheduler, if any (reported by the health endpoint)
    pub scheduler: Option<SchedulerHandle>,
}

impl ApiState {
    pub fn new(store: Arc<dyn TargetStore>) -> Self {
        Self {
            store,
            scheduler: None,
        }
    }

    pub fn with_scheduler(mut self, scheduler: SchedulerHandle) -> Self {
        self.scheduler = Some(scheduler);
        self
    }
}
