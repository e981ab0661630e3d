#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
//! Asynchronous, version-controlled file persistence.
//!
//! A [`VersionedFileHandler`] owns one storage directory. Writes, moves and
//! deletes happen on disk immediately; the minimal set of paths that must be
//! committed together is computed synchronously and handed to a background
//! committer that drains it on a fixed schedule. The CLI binary in
//! `crates/vcstore` builds on top of this library.

/// Registry of configured storage areas.
mod areas;
/// Time source for the committer schedule.
pub mod clock;
/// Background committer and its schedule.
mod committer;
/// TOML configuration.
mod config;
/// Error types.
mod error;
/// Public handler facade.
mod handler;
/// Commit-set planning.
mod plan;
/// FIFO of pending commits.
mod queue;
/// Export of pending commits as a shell script.
mod script;
/// Working-copy status classification.
mod status;
/// Subversion command-line backend.
mod svn;
/// Version-control client abstraction.
mod vcs;

/// Fake backend shared by unit tests.
#[cfg(test)]
mod testing;

pub use areas::StorageAreas;
pub use committer::{
    CommitMode, CommitSchedule, CommitStats, CommitStatsSnapshot, Committer, TickReport,
};
pub use config::{AreaConfig, CommitsConfig, Config, ModeConfig, SvnConfig};
pub use error::{Result, VcStoreError};
pub use handler::{HandlerOptions, VersionedFileHandler};
pub use plan::{CommitDepth, CommitPlanner, PendingCommit};
pub use queue::{CommitQueue, Popped};
pub use script::{SCRIPT_FILE_NAME, ScriptExport};
pub use status::{PathStatus, StatusQuery};
pub use svn::{Credentials, SvnClient};
pub use vcs::VersionControl;
