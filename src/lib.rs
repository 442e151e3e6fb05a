//! Periodic URL uptime fetcher
//!
//! Targets (a URL plus a polling interval) live in a [`storage::TargetStore`].
//! The [`scheduler::Scheduler`] wakes up once per tick, fetches every target
//! whose interval has elapsed and appends the response body and duration to
//! the target's history. The optional HTTP API registers targets and serves
//! their history.

pub mod config;
pub mod scheduler;
pub mod storage;
pub mod util;

#[cfg(feature = "api")]
pub mod api;

pub use scheduler::{Scheduler, SchedulerHandle};
pub use storage::{StorageError, TargetStore};
