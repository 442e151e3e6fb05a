//! Message types for controlling the scheduler task

use tokio::sync::oneshot;

/// Commands that can be sent to a running scheduler
#[derive(Debug)]
pub enum SchedulerCommand {
    /// Run one tick immediately, outside the regular period
    ///
    /// Shares the in-flight set with the periodic ticks, so it never
    /// duplicates a fetch that is already running.
    TickNow {
        respond_to: oneshot::Sender<TickReport>,
    },

    /// Stop ticking, cancel outstanding fetches and wait for them to finish
    Shutdown { respond_to: oneshot::Sender<()> },
}

/// What a single tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Targets returned by the store (zero if listing failed)
    pub listed: usize,

    /// Targets whose interval had elapsed
    pub due: usize,

    /// Due targets that got a new fetch cycle
    pub dispatched: usize,

    /// Due targets skipped because a previous cycle is still running
    pub skipped_in_flight: usize,

    /// Due in the listing but checked again before the tick admitted them
    pub skipped_already_checked: usize,

    /// The store could not list targets
    pub list_failed: bool,
}
