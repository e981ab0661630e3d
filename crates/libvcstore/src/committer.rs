use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::{
    clock::SharedClock,
    error::VcStoreError,
    plan::PendingCommit,
    queue::{CommitQueue, Popped},
    script::ScriptExport,
    vcs::VersionControl,
};

/// Name given to the worker thread.
const WORKER_THREAD_NAME: &str = "vcstore-committer";

/// Timing of the background committer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitSchedule {
    /// Pause before each tick.
    pub check_interval: Duration,
    /// Once a tick has worked this long, it stops taking new entries.
    pub work_budget: Duration,
}

impl CommitSchedule {
    /// Default pause between ticks.
    pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(15);
    /// Default work budget per tick.
    pub const DEFAULT_WORK_BUDGET: Duration = Duration::from_secs(3);
}

impl Default for CommitSchedule {
    fn default() -> Self {
        Self {
            check_interval: Self::DEFAULT_CHECK_INTERVAL,
            work_budget: Self::DEFAULT_WORK_BUDGET,
        }
    }
}

/// What the committer does with each drained entry.
#[derive(Debug, Clone, Default)]
pub enum CommitMode {
    /// Commit through version control, then update the refresh root.
    #[default]
    Execute,
    /// Append the equivalent commands to a script instead.
    ExportScript(ScriptExport),
}

/// Counters shared between producers, the worker and observers.
#[derive(Debug, Default)]
pub struct CommitStats {
    /// Entries accepted by the queue.
    enqueued: AtomicU64,
    /// Entries applied successfully.
    committed: AtomicU64,
    /// Entries dropped after a failure.
    dropped: AtomicU64,
    /// Ticks run by the worker.
    ticks: AtomicU64,
}

/// Point-in-time copy of [`CommitStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitStatsSnapshot {
    /// Entries accepted by the queue.
    pub enqueued: u64,
    /// Entries applied successfully.
    pub committed: u64,
    /// Entries dropped after a failure.
    pub dropped: u64,
    /// Ticks run by the worker.
    pub ticks: u64,
}

impl CommitStats {
    /// Count an accepted entry.
    pub(crate) fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// Read all counters.
    pub fn snapshot(&self) -> CommitStatsSnapshot {
        CommitStatsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            committed: self.committed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            ticks: self.ticks.load(Ordering::Relaxed),
        }
    }
}

/// What happened during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Entries popped this tick.
    pub processed: usize,
    /// Entries applied successfully.
    pub committed: usize,
    /// Entries dropped after a failure.
    pub dropped: usize,
    /// The tick stopped early because it ran past its work budget.
    pub budget_exhausted: bool,
    /// The queue is closed and drained; the worker should stop.
    pub finished: bool,
}

/// Drains a [`CommitQueue`] in time-bounded bursts.
pub struct Committer {
    /// Queue shared with the producers.
    queue: Arc<CommitQueue>,
    /// Client used for the deferred commit and update.
    vcs: Arc<dyn VersionControl>,
    /// Time source for the schedule and the work budget.
    clock: SharedClock,
    /// Tick interval and work budget.
    schedule: CommitSchedule,
    /// Execute or export.
    mode: CommitMode,
    /// Shared counters.
    stats: Arc<CommitStats>,
}

impl Committer {
    /// Create a committer for `queue`.
    pub fn new(
        queue: Arc<CommitQueue>,
        vcs: Arc<dyn VersionControl>,
        clock: SharedClock,
        schedule: CommitSchedule,
        mode: CommitMode,
        stats: Arc<CommitStats>,
    ) -> Self {
        Self {
            queue,
            vcs,
            clock,
            schedule,
            mode,
            stats,
        }
    }

    /// Run one tick: pop and apply entries in order until the queue is empty
    /// or the work budget is spent.
    ///
    /// An entry that has been popped is always applied in full; the budget is
    /// only checked between entries. Failed entries are logged and dropped.
    pub fn tick(&self) -> TickReport {
        self.stats.ticks.fetch_add(1, Ordering::Relaxed);
        let start = self.clock.now();
        let mut report = TickReport::default();

        loop {
            let entry = match self.queue.pop() {
                Popped::Entry(entry) => entry,
                Popped::Empty => break,
                Popped::Closed => {
                    report.finished = report.processed == 0;
                    break;
                }
            };
            report.processed += 1;

            match self.apply(&entry) {
                Ok(()) => {
                    report.committed += 1;
                    self.stats.committed.fetch_add(1, Ordering::Relaxed);
                    info!(
                        paths = entry.paths.len(),
                        refresh_root = %entry.refresh_root.display(),
                        message = %entry.message,
                        "committed"
                    );
                }
                Err(err) => {
                    report.dropped += 1;
                    self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                    let err = VcStoreError::Commit(format!("{err:#}"));
                    warn!(
                        paths = ?entry.paths,
                        message = %entry.message,
                        error = %err,
                        "dropping pending commit"
                    );
                }
            }
            if let Ok(waited) = entry.enqueued_at.elapsed() {
                debug!(waited_ms = waited.as_millis(), "pending commit latency");
            }

            if self.clock.elapsed_since(start) > self.schedule.work_budget {
                report.budget_exhausted = true;
                break;
            }
        }

        report
    }

    /// Apply a single entry according to the commit mode.
    fn apply(&self, entry: &PendingCommit) -> Result<()> {
        match &self.mode {
            CommitMode::Execute => {
                self.vcs.commit(&entry.paths, entry.depth, &entry.message)?;
                self.vcs.update(&entry.refresh_root)?;
            }
            CommitMode::ExportScript(export) => export.append(entry)?,
        }
        Ok(())
    }

    /// Sleep, tick, repeat, until a tick reports that the closed queue is drained.
    pub fn run(self) {
        info!(
            interval_ms = self.schedule.check_interval.as_millis(),
            "background committer started"
        );
        loop {
            self.clock.sleep(self.schedule.check_interval);
            if self.tick().finished {
                break;
            }
        }
        info!("background committer stopped");
    }

    /// Run the committer on its own named thread.
    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || self.run())
    }
}
