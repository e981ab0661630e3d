use std::{
    fmt, fs, io,
    path::{self, Component, Path, PathBuf},
    sync::{Arc, Mutex},
    thread::JoinHandle,
};

use tracing::{debug, info};

use crate::{
    clock::{SharedClock, SystemClock},
    committer::{CommitMode, CommitSchedule, CommitStats, CommitStatsSnapshot, Committer},
    error::{Result, VcStoreError},
    plan::{CommitPlanner, PendingCommit},
    queue::CommitQueue,
    svn::{Credentials, SvnClient},
    vcs::VersionControl,
};

/// Settings for the background committer of a versioned handler.
#[derive(Debug, Clone)]
pub struct HandlerOptions {
    /// Tick interval and work budget.
    pub schedule: CommitSchedule,
    /// Execute commits or export them to a script.
    pub mode: CommitMode,
    /// Time source driving the schedule.
    pub clock: SharedClock,
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self {
            schedule: CommitSchedule::default(),
            mode: CommitMode::Execute,
            clock: SystemClock::shared(),
        }
    }
}

/// Version-control state owned by a versioned handler.
struct Versioning {
    /// Client for the synchronous steps; shared with the committer.
    vcs: Arc<dyn VersionControl>,
    /// Pending commits, drained by the worker.
    queue: Arc<CommitQueue>,
    /// Counters shared with the worker.
    stats: Arc<CommitStats>,
    /// Worker thread, until it has been joined.
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// Keeps the files of one storage directory under version control.
///
/// Every write goes straight to disk; the matching commit is computed
/// synchronously and then handed to a background committer, so callers never
/// wait on the repository. A handler built without version control performs
/// only the disk-level part of each operation.
pub struct VersionedFileHandler {
    /// Absolute path of the managed directory.
    files_dir: PathBuf,
    /// `None` in pass-through mode.
    versioning: Option<Versioning>,
}

impl VersionedFileHandler {
    /// Create a handler for `files_dir`.
    ///
    /// With credentials the directory must be an svn working copy and a
    /// background committer is started; without them the handler is
    /// pass-through.
    pub fn new(
        files_dir: impl AsRef<Path>,
        credentials: Option<Credentials>,
        options: HandlerOptions,
    ) -> Result<Self> {
        match credentials {
            Some(credentials) => Self::with_backend(
                files_dir,
                Arc::new(SvnClient::new(Some(credentials))),
                options,
            ),
            None => Self::pass_through(files_dir),
        }
    }

    /// Create a handler that writes to disk without version control.
    pub fn pass_through(files_dir: impl AsRef<Path>) -> Result<Self> {
        let files_dir = checked_dir(files_dir.as_ref())?;
        debug!(dir = %files_dir.display(), "pass-through storage");
        Ok(Self {
            files_dir,
            versioning: None,
        })
    }

    /// Create a versioned handler on top of an arbitrary version-control backend.
    pub fn with_backend(
        files_dir: impl AsRef<Path>,
        vcs: Arc<dyn VersionControl>,
        options: HandlerOptions,
    ) -> Result<Self> {
        let files_dir = checked_dir(files_dir.as_ref())?;
        let is_working_copy =
            vcs.is_working_copy(&files_dir)
                .map_err(|err| VcStoreError::Construction {
                    dir: files_dir.clone(),
                    message: format!("{err:#}"),
                })?;
        if !is_working_copy {
            return Err(VcStoreError::Construction {
                dir: files_dir,
                message: "not under version control".to_string(),
            });
        }

        let queue = Arc::new(CommitQueue::new());
        let stats = Arc::new(CommitStats::default());
        let worker = Committer::new(
            Arc::clone(&queue),
            Arc::clone(&vcs),
            options.clock,
            options.schedule,
            options.mode,
            Arc::clone(&stats),
        )
        .spawn()
        .map_err(|err| VcStoreError::Construction {
            dir: files_dir.clone(),
            message: format!("failed to start background committer: {err}"),
        })?;
        info!(dir = %files_dir.display(), "versioned storage");

        Ok(Self {
            files_dir,
            versioning: Some(Versioning {
                vcs,
                queue,
                stats,
                worker: Mutex::new(Some(worker)),
            }),
        })
    }

    /// The managed directory.
    pub fn files_dir(&self) -> &Path {
        &self.files_dir
    }

    /// Whether this handler commits to version control.
    pub fn is_versioned(&self) -> bool {
        self.versioning.is_some()
    }

    /// Resolve `path` against the managed directory, rejecting paths outside it.
    pub fn resolve(&self, path: &Path) -> Result<PathBuf> {
        let resolved = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.files_dir.join(path)
        };
        let escapes = resolved
            .components()
            .any(|component| component == Component::ParentDir);
        if escapes || !resolved.starts_with(&self.files_dir) {
            return Err(VcStoreError::Operation {
                path: resolved,
                message: format!("not inside {}", self.files_dir.display()),
            });
        }
        Ok(resolved)
    }

    /// Resolve a path that an operation will write, move or delete.
    ///
    /// The managed directory itself is never a valid target.
    fn resolve_entry(&self, path: &Path) -> Result<PathBuf> {
        let resolved = self.resolve(path)?;
        if resolved == self.files_dir {
            return Err(VcStoreError::Operation {
                path: resolved,
                message: "refers to the storage directory itself".to_string(),
            });
        }
        Ok(resolved)
    }

    /// Versioning state, refusing work once shutdown has been requested.
    fn open_versioning(&self) -> Result<Option<&Versioning>> {
        match &self.versioning {
            Some(versioning) if versioning.queue.is_closed() => Err(VcStoreError::ShutDown {
                dir: self.files_dir.clone(),
            }),
            other => Ok(other.as_ref()),
        }
    }

    /// Hand a pending commit to the background committer.
    fn enqueue(&self, versioning: &Versioning, entry: PendingCommit) -> Result<()> {
        debug!(
            paths = ?entry.paths,
            refresh_root = %entry.refresh_root.display(),
            "queueing commit"
        );
        versioning
            .queue
            .push(entry)
            .map_err(|_| VcStoreError::ShutDown {
                dir: self.files_dir.clone(),
            })?;
        versioning.stats.record_enqueued();
        Ok(())
    }

    /// Write `contents` to `path`, creating parent directories, then commit it.
    pub fn write_file(
        &self,
        path: impl AsRef<Path>,
        contents: impl AsRef<[u8]>,
        message: &str,
    ) -> Result<()> {
        let path = self.resolve_entry(path.as_ref())?;
        self.open_versioning()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| io_failure(parent, &err))?;
        }
        fs::write(&path, contents).map_err(|err| io_failure(&path, &err))?;
        self.commit_version(&path, message)
    }

    /// Commit the current on-disk state of `path`, adding it to version control
    /// first if needed.
    ///
    /// Returns once the add and the ancestor climb are done; the commit itself
    /// happens later on the background committer.
    pub fn commit_version(&self, path: impl AsRef<Path>, message: &str) -> Result<()> {
        let path = self.resolve_entry(path.as_ref())?;
        let Some(versioning) = self.open_versioning()? else {
            return Ok(());
        };

        let planner = CommitPlanner::new(versioning.vcs.as_ref(), &self.files_dir);
        let entry = planner
            .plan_commit(&path, message)
            .map_err(|err| VcStoreError::operation(&path, &err))?;
        match entry {
            Some(entry) => self.enqueue(versioning, entry),
            None => Ok(()),
        }
    }

    /// Move `old_path` to `new_path` and queue a commit recording both.
    pub fn move_versioned_file(
        &self,
        old_path: impl AsRef<Path>,
        new_path: impl AsRef<Path>,
        message: &str,
    ) -> Result<()> {
        let old_path = self.resolve_entry(old_path.as_ref())?;
        let new_path = self.resolve_entry(new_path.as_ref())?;
        let versioning = self.open_versioning()?;
        if let Some(parent) = new_path.parent() {
            fs::create_dir_all(parent).map_err(|err| io_failure(parent, &err))?;
        }
        let Some(versioning) = versioning else {
            return fs::rename(&old_path, &new_path).map_err(|err| io_failure(&old_path, &err));
        };

        let planner = CommitPlanner::new(versioning.vcs.as_ref(), &self.files_dir);
        let entry = planner
            .plan_move(&old_path, &new_path, message)
            .map_err(|err| VcStoreError::operation(&old_path, &err))?;
        self.enqueue(versioning, entry)
    }

    /// Delete `path` from disk and version control and queue the commit.
    pub fn delete_versioned_file(&self, path: impl AsRef<Path>, message: &str) -> Result<()> {
        let path = self.resolve_entry(path.as_ref())?;
        let Some(versioning) = self.open_versioning()? else {
            let removed = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            return removed.map_err(|err| io_failure(&path, &err));
        };

        let planner = CommitPlanner::new(versioning.vcs.as_ref(), &self.files_dir);
        let entry = planner
            .plan_delete(&path, message)
            .map_err(|err| VcStoreError::operation(&path, &err))?;
        self.enqueue(versioning, entry)
    }

    /// Stop accepting new commits. Already queued commits still drain.
    ///
    /// Returns immediately and may be called any number of times.
    pub fn shutdown(&self) {
        if let Some(versioning) = &self.versioning
            && versioning.queue.close()
        {
            info!(
                dir = %self.files_dir.display(),
                pending = versioning.queue.len(),
                "shutdown requested"
            );
        }
    }

    /// Whether shutdown has been requested.
    pub fn is_shut_down(&self) -> bool {
        self.versioning
            .as_ref()
            .is_some_and(|versioning| versioning.queue.is_closed())
    }

    /// Number of commits waiting for the background committer.
    pub fn pending_commits(&self) -> usize {
        self.versioning
            .as_ref()
            .map_or(0, |versioning| versioning.queue.len())
    }

    /// Commit counters, or `None` in pass-through mode.
    pub fn stats(&self) -> Option<CommitStatsSnapshot> {
        self.versioning
            .as_ref()
            .map(|versioning| versioning.stats.snapshot())
    }

    /// Block until the background committer has drained the queue and exited.
    ///
    /// Must be called after [`shutdown`](Self::shutdown).
    pub fn join(&self) -> Result<()> {
        let Some(versioning) = &self.versioning else {
            return Ok(());
        };
        if !versioning.queue.is_closed() {
            return Err(VcStoreError::Operation {
                path: self.files_dir.clone(),
                message: "join called before shutdown".to_string(),
            });
        }
        let worker = versioning
            .worker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(worker) = worker {
            worker
                .join()
                .map_err(|_| VcStoreError::Commit("background committer panicked".to_string()))?;
        }
        Ok(())
    }
}

impl fmt::Debug for VersionedFileHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionedFileHandler")
            .field("files_dir", &self.files_dir)
            .field("versioned", &self.is_versioned())
            .field("shut_down", &self.is_shut_down())
            .field("pending_commits", &self.pending_commits())
            .finish()
    }
}

impl Drop for VersionedFileHandler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Check that `dir` is an existing directory and return its absolute form.
fn checked_dir(dir: &Path) -> Result<PathBuf> {
    let construction = |message: &str| VcStoreError::Construction {
        dir: dir.to_path_buf(),
        message: message.to_string(),
    };
    if !dir.exists() {
        return Err(construction("directory does not exist"));
    }
    if !dir.is_dir() {
        return Err(construction("not a directory"));
    }
    path::absolute(dir).map_err(|err| construction(&err.to_string()))
}

/// Map a disk failure during a synchronous operation.
fn io_failure(path: &Path, err: &io::Error) -> VcStoreError {
    VcStoreError::Operation {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
