use std::fmt;

/// Version-control state of a single path in a working copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathStatus {
    /// Tracked and unchanged since the last commit.
    Clean,
    /// Scheduled for addition.
    Added,
    /// Tracked with local content or property changes.
    Modified,
    /// Deleted and re-added in the same working-copy revision.
    Replaced,
    /// Scheduled for deletion, or missing from disk.
    Deleted,
    /// Present on disk but unknown to version control.
    Unversioned,
    /// Not inside the tracked tree at all.
    OutsideTree,
}

impl PathStatus {
    /// Whether a path with this status has to be part of the next commit.
    pub fn is_dirty(self) -> bool {
        matches!(self, Self::Added | Self::Modified | Self::Replaced)
    }

    /// Whether a path with this status must be registered before it can be committed.
    pub fn needs_add(self) -> bool {
        matches!(self, Self::Unversioned | Self::Deleted)
    }
}

impl fmt::Display for PathStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Clean => "clean",
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Replaced => "replaced",
            Self::Deleted => "deleted",
            Self::Unversioned => "unversioned",
            Self::OutsideTree => "outside tree",
        };
        f.write_str(name)
    }
}

/// Raw answer of a status query.
///
/// A query can report a definite status, or report that no status is
/// available. What "no status" means depends on the caller: before an add it
/// means the path still has to be registered, while climbing ancestors it means
/// the climb has left the tracked tree. The two interpretations are
/// [`StatusQuery::before_add`] and [`StatusQuery::while_climbing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusQuery {
    /// Version control reported a status for the path.
    Tracked(PathStatus),
    /// The path lies inside a working copy but version control has no record of it.
    NotTracked,
    /// The path is not inside any working copy.
    OutsideTree,
}

impl StatusQuery {
    /// Interpret the answer ahead of an add: anything without a status is unversioned.
    pub fn before_add(self) -> PathStatus {
        match self {
            Self::Tracked(status) => status,
            Self::NotTracked | Self::OutsideTree => PathStatus::Unversioned,
        }
    }

    /// Interpret the answer while climbing ancestors: anything without a status ends the climb.
    pub fn while_climbing(self) -> PathStatus {
        match self {
            Self::Tracked(status) => status,
            Self::NotTracked | Self::OutsideTree => PathStatus::OutsideTree,
        }
    }
}
