use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::{plan::CommitDepth, status::StatusQuery};

/// Operations the persistence layer needs from a version-control client.
///
/// Every method acts on the working copy directly. Implementations must be
/// safe to call from many producer threads at once; the background committer
/// only ever calls [`commit`](Self::commit) and [`update`](Self::update).
pub trait VersionControl: Send + Sync {
    /// Check whether `dir` is the root (or a directory) of a valid working copy.
    fn is_working_copy(&self, dir: &Path) -> Result<bool>;

    /// Query the status of a single path without descending into it.
    fn status(&self, path: &Path) -> Result<StatusQuery>;

    /// Register `path` for addition, forcing it and creating untracked parents,
    /// without recursing into directory content.
    fn add(&self, path: &Path) -> Result<()>;

    /// Move or rename `from` to `to`, both on disk and in the index.
    fn move_path(&self, from: &Path, to: &Path) -> Result<()>;

    /// Remove `path` from both disk and the index.
    fn delete(&self, path: &Path) -> Result<()>;

    /// Commit `paths` as one atomic commit, recursing below them only as far as `depth`.
    fn commit(&self, paths: &[PathBuf], depth: CommitDepth, message: &str) -> Result<()>;

    /// Bring `path` and everything below it up to date with the repository.
    fn update(&self, path: &Path) -> Result<()>;
}
