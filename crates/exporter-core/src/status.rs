//! Outcome markers accumulated by tasks.

use serde::{Serialize, Serializer};
use std::fmt;

/// A single outcome tag. Several tags may be set on one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Skipped,
    Overwritten,
    Fetched,
    Success,
    Interrupted,
    Error,
    Rollbacked,
    RollbackedError,
    DryRun,
    MultipleSourceProjects,
    NoSourceProject,
}

impl Status {
    /// Every marker, in bit order.
    pub const ALL: [Status; 11] = [
        Status::Skipped,
        Status::Overwritten,
        Status::Fetched,
        Status::Success,
        Status::Interrupted,
        Status::Error,
        Status::Rollbacked,
        Status::RollbackedError,
        Status::DryRun,
        Status::MultipleSourceProjects,
        Status::NoSourceProject,
    ];

    fn bit(self) -> u16 {
        1 << (self as u16)
    }

    /// Upper-case tag name used in reports and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skipped => "SKIPPED",
            Self::Overwritten => "OVERWRITTEN",
            Self::Fetched => "FETCHED",
            Self::Success => "SUCCESS",
            Self::Interrupted => "INTERRUPTED",
            Self::Error => "ERROR",
            Self::Rollbacked => "ROLLBACKED",
            Self::RollbackedError => "ROLLBACKED_ERROR",
            Self::DryRun => "DRY_RUN",
            Self::MultipleSourceProjects => "MULTIPLE_SOURCE_PROJECTS",
            Self::NoSourceProject => "NO_SOURCE_PROJECT",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of [`Status`] markers backed by a bitmask.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StatusSet(u16);

impl StatusSet {
    /// Create an empty set.
    pub const fn new() -> Self {
        Self(0)
    }

    /// Add a marker. Returns `true` if it was not present.
    pub fn insert(&mut self, status: Status) -> bool {
        let added = !self.contains(status);
        self.0 |= status.bit();
        added
    }

    pub fn contains(&self, status: Status) -> bool {
        self.0 & status.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Check that `status` is the only marker set.
    pub fn is_exactly(&self, status: Status) -> bool {
        self.0 == status.bit()
    }

    pub fn iter(&self) -> impl Iterator<Item = Status> + '_ {
        Status::ALL.into_iter().filter(|s| self.contains(*s))
    }
}

impl FromIterator<Status> for StatusSet {
    fn from_iter<I: IntoIterator<Item = Status>>(iter: I) -> Self {
        let mut set = Self::new();
        for status in iter {
            set.insert(status);
        }
        set
    }
}

impl fmt::Debug for StatusSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for StatusSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|s| s.as_str()).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

impl Serialize for StatusSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}
