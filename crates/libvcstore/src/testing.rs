//! In-memory version-control backend for unit tests.

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use anyhow::{Result, anyhow, bail};

use crate::{
    clock::ManualClock,
    plan::CommitDepth,
    status::{PathStatus, StatusQuery},
    vcs::VersionControl,
};

/// A mutating call recorded by [`FakeVcs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `add(path)`.
    Add(PathBuf),
    /// `move_path(from, to)`.
    Move(PathBuf, PathBuf),
    /// `delete(path)`.
    Delete(PathBuf),
    /// `commit(paths, message)`.
    Commit(Vec<PathBuf>, String),
    /// `update(path)`.
    Update(PathBuf),
}

/// Mutable state behind the fake.
#[derive(Default)]
struct FakeState {
    /// Status reported per path; unknown paths are `NotTracked`.
    statuses: HashMap<PathBuf, StatusQuery>,
    /// Paths whose status query fails.
    failing_status: HashSet<PathBuf>,
    /// Whether add/move/delete fail.
    fail_mutations: bool,
    /// Commit messages whose commit fails.
    failing_commits: HashSet<String>,
    /// Whether `is_working_copy` reports false.
    not_working_copy: bool,
    /// Clock advanced by each commit, with the cost per commit.
    commit_cost: Option<(Arc<ManualClock>, Duration)>,
    /// Mutating calls in order.
    calls: Vec<Call>,
    /// Paths passed to `status`, in order.
    status_queries: Vec<PathBuf>,
    /// Depth of every successful commit, in order.
    commit_depths: Vec<CommitDepth>,
}

/// Scriptable [`VersionControl`] that records every call.
#[derive(Default)]
pub struct FakeVcs {
    /// Shared state; the fake is used from producer and worker threads.
    state: Mutex<FakeState>,
}

impl FakeVcs {
    /// Create an empty fake.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Lock the state, ignoring poisoning from a panicked test thread.
    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Set the status reported for `path`.
    pub(crate) fn set(&self, path: impl Into<PathBuf>, query: StatusQuery) {
        self.state().statuses.insert(path.into(), query);
    }

    /// Make status queries for `path` fail.
    pub(crate) fn fail_status(&self, path: impl Into<PathBuf>) {
        self.state().failing_status.insert(path.into());
    }

    /// Make every add, move and delete fail.
    pub(crate) fn fail_mutations(&self) {
        self.state().fail_mutations = true;
    }

    /// Make commits carrying `message` fail.
    pub(crate) fn fail_commits_with(&self, message: &str) {
        self.state().failing_commits.insert(message.to_string());
    }

    /// Report that no directory is a working copy.
    pub(crate) fn not_working_copy(&self) {
        self.state().not_working_copy = true;
    }

    /// Advance `clock` by `cost` for every commit.
    pub(crate) fn with_commit_cost(&self, clock: Arc<ManualClock>, cost: Duration) {
        self.state().commit_cost = Some((clock, cost));
    }

    /// Every mutating call so far.
    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Paths added so far.
    pub(crate) fn adds(&self) -> Vec<PathBuf> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Add(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    /// Commits performed so far, as `(paths, message)`.
    pub(crate) fn commits(&self) -> Vec<(Vec<PathBuf>, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Commit(paths, message) => Some((paths, message)),
                _ => None,
            })
            .collect()
    }

    /// Depth of each successful commit.
    pub(crate) fn commit_depths(&self) -> Vec<CommitDepth> {
        self.state().commit_depths.clone()
    }

    /// Paths whose status was queried.
    pub(crate) fn status_queries(&self) -> Vec<PathBuf> {
        self.state().status_queries.clone()
    }

    /// Record a mutation, failing it when mutations are configured to fail.
    fn mutate(&self, call: Call) -> Result<()> {
        let mut state = self.state();
        if state.fail_mutations {
            bail!("simulated failure for {call:?}");
        }
        match &call {
            Call::Add(path) => {
                state
                    .statuses
                    .insert(path.clone(), StatusQuery::Tracked(PathStatus::Added));
            }
            Call::Move(from, to) => {
                state
                    .statuses
                    .insert(from.clone(), StatusQuery::Tracked(PathStatus::Deleted));
                state
                    .statuses
                    .insert(to.clone(), StatusQuery::Tracked(PathStatus::Added));
            }
            Call::Delete(path) => {
                state
                    .statuses
                    .insert(path.clone(), StatusQuery::Tracked(PathStatus::Deleted));
            }
            Call::Commit(..) | Call::Update(_) => {}
        }
        state.calls.push(call);
        Ok(())
    }
}

impl VersionControl for FakeVcs {
    fn is_working_copy(&self, _dir: &Path) -> Result<bool> {
        Ok(!self.state().not_working_copy)
    }

    fn status(&self, path: &Path) -> Result<StatusQuery> {
        let mut state = self.state();
        state.status_queries.push(path.to_path_buf());
        if state.failing_status.contains(path) {
            return Err(anyhow!("simulated status failure for {}", path.display()));
        }
        Ok(state
            .statuses
            .get(path)
            .copied()
            .unwrap_or(StatusQuery::NotTracked))
    }

    fn add(&self, path: &Path) -> Result<()> {
        self.mutate(Call::Add(path.to_path_buf()))
    }

    fn move_path(&self, from: &Path, to: &Path) -> Result<()> {
        self.mutate(Call::Move(from.to_path_buf(), to.to_path_buf()))
    }

    fn delete(&self, path: &Path) -> Result<()> {
        self.mutate(Call::Delete(path.to_path_buf()))
    }

    fn commit(&self, paths: &[PathBuf], depth: CommitDepth, message: &str) -> Result<()> {
        let mut state = self.state();
        if let Some((clock, cost)) = &state.commit_cost {
            clock.advance(*cost);
        }
        if state.failing_commits.contains(message) {
            bail!("simulated commit failure: {message}");
        }
        for path in paths {
            let committed = match state.statuses.get(path) {
                Some(StatusQuery::Tracked(PathStatus::Deleted)) => StatusQuery::NotTracked,
                _ => StatusQuery::Tracked(PathStatus::Clean),
            };
            state.statuses.insert(path.clone(), committed);
        }
        state.commit_depths.push(depth);
        state
            .calls
            .push(Call::Commit(paths.to_vec(), message.to_string()));
        Ok(())
    }

    fn update(&self, path: &Path) -> Result<()> {
        self.state().calls.push(Call::Update(path.to_path_buf()));
        Ok(())
    }
}
