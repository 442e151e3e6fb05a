//! Polling scheduler
//!
//! Once per tick the scheduler lists every target from the store, keeps the
//! ones whose interval has elapsed, and starts one fetch cycle per due target
//! that is not already being fetched.
//!
//! ## Flow
//!
//! ```text
//! Tick → TargetStore::list_targets → is_due → InFlightGuard::try_acquire
//!                                                      │
//!                     TargetStore::get_last_check → is_due
//!                                                      │
//!                                    spawn fetch cycle ┘
//!                                    FetchExecutor::execute → TargetStore::append_history
//! ```
//!
//! A tick never waits for the cycles it started. Each cycle owns an
//! [`InFlightPermit`] for its target, so the next tick skips that target
//! until the cycle ends, whichever way it ends. A cycle appends before it
//! releases, so the last check read under a fresh permit is never older
//! than the newest completed fetch.
//!
//! ## Shutdown
//!
//! A [`CancellationToken`] is shared by the tick loop and every fetch
//! cycle. [`SchedulerHandle::shutdown`] stops ticking and aborts outstanding
//! fetches without writing history for them. It returns once every cycle
//! has released its target.

pub mod due;
pub mod executor;
pub mod guard;
pub mod messages;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio::sync::{Semaphore, mpsc, oneshot};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, instrument, warn};

use crate::config::SchedulerConfig;
use crate::storage::{Target, TargetStore};

pub use due::is_due;
pub use executor::{FetchExecutor, FetchOutcome};
pub use guard::{InFlightGuard, InFlightPermit};
pub use messages::{SchedulerCommand, TickReport};

/// Tick driver plus everything a fetch cycle needs
pub struct Scheduler {
    store: Arc<dyn TargetStore>,

    executor: FetchExecutor,

    /// Target ids with an outstanding fetch cycle
    guard: InFlightGuard,

    tick_interval: Duration,

    /// Optional cap on simultaneously running fetches
    limiter: Option<Arc<Semaphore>>,

    /// Every spawned fetch cycle, so shutdown can wait for them
    tracker: TaskTracker,

    cancel: CancellationToken,
}

impl Scheduler {
    /// Create a scheduler reading targets from `store`
    pub fn new(store: Arc<dyn TargetStore>, config: &SchedulerConfig) -> Result<Self> {
        let executor = FetchExecutor::new(config.fetch_timeout())?;
        Ok(Self::with_executor(store, executor, config))
    }

    /// Create a scheduler with a preconfigured executor
    pub fn with_executor(
        store: Arc<dyn TargetStore>,
        executor: FetchExecutor,
        config: &SchedulerConfig,
    ) -> Self {
        let limiter = config
            .max_concurrent_fetches
            .map(|limit| Arc::new(Semaphore::new(limit.max(1))));

        Self {
            store,
            executor,
            guard: InFlightGuard::new(),
            tick_interval: config.tick_interval(),
            limiter,
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn in_flight(&self) -> &InFlightGuard {
        &self.guard
    }

    /// Start ticking in the background and return immediately
    ///
    /// Dropping every handle does not stop the scheduler; it keeps running
    /// for the lifetime of the runtime unless shut down.
    pub fn start(self) -> SchedulerHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let handle = SchedulerHandle {
            sender: cmd_tx,
            guard: self.guard.clone(),
        };

        tokio::spawn(self.run(cmd_rx));

        handle
    }

    #[instrument(skip_all)]
    async fn run(self, mut command_rx: mpsc::Receiver<SchedulerCommand>) {
        info!("starting scheduler, ticking every {:?}", self.tick_interval);

        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut shutdown_requested_by = None;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }

                Some(cmd) = command_rx.recv() => {
                    match cmd {
                        SchedulerCommand::TickNow { respond_to } => {
                            debug!("received TickNow command");
                            let report = self.tick().await;
                            let _ = respond_to.send(report);
                        }

                        SchedulerCommand::Shutdown { respond_to } => {
                            debug!("received shutdown command");
                            shutdown_requested_by = Some(respond_to);
                            break;
                        }
                    }
                }
            }
        }

        self.shutdown().await;
        drop(command_rx);

        if let Some(respond_to) = shutdown_requested_by {
            let _ = respond_to.send(());
        }

        info!("scheduler stopped");
    }

    /// Run one tick: list, filter, admit and dispatch
    ///
    /// `now` is taken once at the start of the tick and used for every
    /// due check. Returns as soon as the cycles are spawned.
    #[instrument(skip(self))]
    pub async fn tick(&self) -> TickReport {
        let mut report = TickReport::default();

        if self.cancel.is_cancelled() {
            return report;
        }

        let now = Utc::now();

        let targets = match self.store.list_targets().await {
            Ok(targets) => targets,
            Err(e) => {
                error!("failed to list targets, skipping tick: {e}");
                report.list_failed = true;
                Vec::new()
            }
        };

        report.listed = targets.len();

        for target in targets {
            if !is_due(&target, now) {
                continue;
            }
            report.due += 1;

            let Some(permit) = self.guard.try_acquire(target.id) else {
                debug!(
                    target_id = target.id,
                    "skipping target because it's being processed by another fetch cycle"
                );
                report.skipped_in_flight += 1;
                continue;
            };

            // The listing may predate a cycle that finished since. Cycles
            // append before releasing, so under the permit the store is current.
            let target = match self.store.get_last_check(target.id).await {
                Ok(last_check) => Target {
                    last_check,
                    ..target
                },
                Err(e) => {
                    warn!(target_id = target.id, "failed to re-read last check, skipping: {e}");
                    continue;
                }
            };

            if !is_due(&target, now) {
                debug!(
                    target_id = target.id,
                    "skipping target because it was checked after the listing"
                );
                report.skipped_already_checked += 1;
                continue;
            }

            info!(
                target_id = target.id,
                url = %target.url,
                interval_secs = target.interval_secs,
                last_check = ?target.last_check,
                "interval passed after last check, retrieving response"
            );

            self.dispatch(target, permit);
            report.dispatched += 1;
        }

        report
    }

    /// Cancel outstanding fetch cycles and wait until all of them ended
    ///
    /// Called by the task started with [`Scheduler::start`]; public for
    /// callers that drive [`Scheduler::tick`] themselves.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tracker.close();

        let outstanding = self.guard.len();
        if outstanding > 0 {
            info!("waiting for {outstanding} fetch cycles to stop");
        }

        self.tracker.wait().await;
    }

    fn dispatch(&self, target: Target, permit: InFlightPermit) {
        let cycle = FetchCycle {
            store: self.store.clone(),
            executor: self.executor.clone(),
            limiter: self.limiter.clone(),
            cancel: self.cancel.clone(),
            target,
            permit,
        };

        self.tracker.spawn(cycle.run());
    }
}

/// One fetch-and-record run for a single target
struct FetchCycle {
    store: Arc<dyn TargetStore>,
    executor: FetchExecutor,
    limiter: Option<Arc<Semaphore>>,
    cancel: CancellationToken,
    target: Target,
    permit: InFlightPermit,
}

impl FetchCycle {
    #[instrument(skip_all, fields(target_id = self.target.id))]
    async fn run(self) {
        let FetchCycle {
            store,
            executor,
            limiter,
            cancel,
            target,
            permit: _permit,
        } = self;

        let _slot = match limiter {
            Some(limiter) => tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                slot = limiter.acquire_owned() => match slot {
                    Ok(slot) => Some(slot),
                    Err(_) => return,
                },
            },
            None => None,
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("fetch cancelled by shutdown");
                return;
            }
            outcome = executor.execute(&target) => outcome,
        };

        match outcome {
            FetchOutcome::Succeeded {
                body,
                duration_secs,
            } => {
                debug!(bytes = body.len(), duration_secs, "response received");

                if let Err(e) = store
                    .append_history(target.id, body, duration_secs)
                    .await
                {
                    error!("error saving response: {e}");
                }
            }
            FetchOutcome::Failed { reason } => {
                warn!(url = %target.url, "fetch failed: {reason}");
            }
        }
    }
}

/// Handle for controlling a running [`Scheduler`]
#[derive(Clone)]
pub struct SchedulerHandle {
    sender: mpsc::Sender<SchedulerCommand>,
    guard: InFlightGuard,
}

impl SchedulerHandle {
    /// Run one tick immediately and report what it dispatched
    pub async fn tick_now(&self) -> Result<TickReport> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SchedulerCommand::TickNow { respond_to: tx })
            .await?;

        Ok(rx.await?)
    }

    /// Stop the scheduler and wait for outstanding fetch cycles to end
    ///
    /// Safe to call more than once and from several clones.
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self
            .sender
            .send(SchedulerCommand::Shutdown { respond_to: tx })
            .await
            .is_err()
        {
            return;
        }

        // Queued commands are only dropped once draining has finished
        let _ = rx.await;
    }

    /// Number of targets with an outstanding fetch cycle
    pub fn in_flight(&self) -> usize {
        self.guard.len()
    }

    pub fn is_running(&self) -> bool {
        !self.sender.is_closed()
    }
}
