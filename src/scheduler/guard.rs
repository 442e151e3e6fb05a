//! In-flight admission control
//!
//! A tick fires every second, so a fetch that takes longer than one tick
//! would otherwise be dispatched again for the same target. The guard keeps
//! the set of target ids with an outstanding fetch cycle.
//!
//! Admission is a single critical section: checking and marking an id happen
//! under the same lock, so two ticks racing for one overdue target can never
//! both proceed. The returned [`InFlightPermit`] removes the marker when it
//! is dropped, which covers success, failure, cancellation and unwinding.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::storage::TargetId;

/// Shared set of target ids currently being fetched
#[derive(Debug, Clone, Default)]
pub struct InFlightGuard {
    ids: Arc<Mutex<HashSet<TargetId>>>,
}

impl InFlightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` as in flight unless it already is
    ///
    /// Returns `None` without touching the set if another cycle holds `id`.
    pub fn try_acquire(&self, id: TargetId) -> Option<InFlightPermit> {
        if self.lock().insert(id) {
            Some(InFlightPermit {
                guard: self.clone(),
                id,
            })
        } else {
            None
        }
    }

    pub fn is_in_flight(&self, id: TargetId) -> bool {
        self.lock().contains(&id)
    }

    /// Number of targets with an outstanding fetch cycle
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn release(&self, id: TargetId) {
        self.lock().remove(&id);
    }

    // The set stays consistent even if a holder panicked: insert and remove
    // are single operations.
    fn lock(&self) -> MutexGuard<'_, HashSet<TargetId>> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Proof that the holder owns the in-flight marker of one target
#[must_use = "dropping the permit immediately releases the target"]
#[derive(Debug)]
pub struct InFlightPermit {
    guard: InFlightGuard,
    id: TargetId,
}

impl InFlightPermit {
    pub fn target_id(&self) -> TargetId {
        self.id
    }

    /// Release the marker now instead of at the end of scope
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for InFlightPermit {
    fn drop(&mut self) {
        self.guard.release(self.id);
    }
}
