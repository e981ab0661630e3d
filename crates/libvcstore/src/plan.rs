use std::{
    path::{Path, PathBuf},
    time::SystemTime,
};

use anyhow::Result;
use tracing::debug;

use crate::{status::PathStatus, vcs::VersionControl};

/// How far a commit reaches below the paths it lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommitDepth {
    /// Only the listed paths themselves.
    #[default]
    Empty,
    /// The listed paths and everything below them. Needed when a directory
    /// with children is deleted or moved away.
    Infinity,
}

impl CommitDepth {
    /// Depth needed to commit the removal of `path`, judged while it is still on disk.
    fn for_removal(path: &Path) -> Self {
        if path.is_dir() {
            Self::Infinity
        } else {
            Self::Empty
        }
    }

    /// The matching svn `--depth` option.
    pub fn as_arg(self) -> &'static str {
        match self {
            Self::Empty => "--depth=empty",
            Self::Infinity => "--depth=infinity",
        }
    }
}

/// One atomic commit-and-refresh unit waiting for the background committer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommit {
    /// Paths committed together, changed path first, outermost ancestor last.
    pub paths: Vec<PathBuf>,
    /// Recursion applied when committing `paths`.
    pub depth: CommitDepth,
    /// Topmost directory updated after the commit.
    pub refresh_root: PathBuf,
    /// Commit message.
    pub message: String,
    /// When the entry was handed to the queue.
    pub enqueued_at: SystemTime,
}

/// Computes minimal commit sets for paths inside one working copy.
pub struct CommitPlanner<'a> {
    /// Client used for status queries and the synchronous add/move/delete steps.
    vcs: &'a dyn VersionControl,
    /// Root of the working copy; the climb never leaves it.
    root: &'a Path,
}

impl<'a> CommitPlanner<'a> {
    /// Create a planner for the working copy rooted at `root`.
    pub fn new(vcs: &'a dyn VersionControl, root: &'a Path) -> Self {
        Self { vcs, root }
    }

    /// Status of `path` as seen just before a possible add.
    fn status_before_add(&self, path: &Path) -> PathStatus {
        match self.vcs.status(path) {
            Ok(query) => query.before_add(),
            Err(err) => {
                debug!(path = %path.display(), error = %err, "no status before add");
                PathStatus::Unversioned
            }
        }
    }

    /// Status of an ancestor directory while climbing.
    fn status_while_climbing(&self, path: &Path) -> PathStatus {
        match self.vcs.status(path) {
            Ok(query) => query.while_climbing(),
            Err(err) => {
                debug!(path = %path.display(), error = %err, "no status while climbing");
                PathStatus::OutsideTree
            }
        }
    }

    /// Register `path` with version control if it is unversioned or scheduled
    /// for deletion. Returns the status observed before any add.
    pub fn ensure_added(&self, path: &Path) -> Result<PathStatus> {
        let status = self.status_before_add(path);
        if status.needs_add() {
            debug!(path = %path.display(), %status, "adding to version control");
            self.vcs.add(path)?;
        }
        Ok(status)
    }

    /// Climb from `start`'s parent, appending every dirty ancestor to `paths`.
    ///
    /// Returns the refresh root: the first clean ancestor, or the outermost dirty
    /// one when the climb leaves the working copy first. Falls back to `start`
    /// when no ancestor qualifies.
    pub fn climb(&self, start: &Path, paths: &mut Vec<PathBuf>) -> PathBuf {
        let mut refresh_root = start.to_path_buf();
        let mut cursor = start.parent();

        while let Some(dir) = cursor {
            if !dir.starts_with(self.root) {
                break;
            }
            let status = self.status_while_climbing(dir);
            if status.is_dirty() {
                paths.push(dir.to_path_buf());
                refresh_root = dir.to_path_buf();
                cursor = dir.parent();
            } else {
                if status == PathStatus::Clean {
                    refresh_root = dir.to_path_buf();
                }
                break;
            }
        }

        refresh_root
    }

    /// Add `path` if needed and compute the batch that commits it.
    ///
    /// Returns `None` when `path` and all its ancestors are already clean, so
    /// there is nothing to commit.
    pub fn plan_commit(&self, path: &Path, message: &str) -> Result<Option<PendingCommit>> {
        let status = self.ensure_added(path)?;

        let mut paths = vec![path.to_path_buf()];
        let refresh_root = self.climb(path, &mut paths);

        if status == PathStatus::Clean && paths.len() == 1 {
            debug!(path = %path.display(), "already committed; nothing to queue");
            return Ok(None);
        }

        Ok(Some(pending(paths, CommitDepth::Empty, refresh_root, message)))
    }

    /// Move `from` to `to` and compute the batch recording both ends.
    ///
    /// The destination's parent is registered first when it has no status, so
    /// the move can land inside a freshly created directory.
    pub fn plan_move(&self, from: &Path, to: &Path, message: &str) -> Result<PendingCommit> {
        if let Some(parent) = to.parent()
            && parent.starts_with(self.root)
            && parent != self.root
        {
            self.ensure_added(parent)?;
        }
        let depth = CommitDepth::for_removal(from);
        self.vcs.move_path(from, to)?;

        let mut paths = vec![from.to_path_buf(), to.to_path_buf()];
        let refresh_root = self.climb(to, &mut paths);
        Ok(pending(paths, depth, refresh_root, message))
    }

    /// Delete `path` and compute the batch recording the deletion.
    pub fn plan_delete(&self, path: &Path, message: &str) -> Result<PendingCommit> {
        let depth = CommitDepth::for_removal(path);
        self.vcs.delete(path)?;

        let refresh_root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.to_path_buf());
        Ok(pending(vec![path.to_path_buf()], depth, refresh_root, message))
    }
}

/// Assemble a pending commit stamped with the current time.
fn pending(
    paths: Vec<PathBuf>,
    depth: CommitDepth,
    refresh_root: PathBuf,
    message: &str,
) -> PendingCommit {
    PendingCommit {
        paths,
        depth,
        refresh_root,
        message: message.to_string(),
        enqueued_at: SystemTime::now(),
    }
}
