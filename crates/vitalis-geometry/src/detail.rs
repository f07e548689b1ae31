//! The ordered detail levels a structure can be rendered at.

use serde::{Deserialize, Serialize};

/// Discrete level of detail, ordered from coarsest to finest.
///
/// `Far < Medium < Near < Closeup`, so "finer" means "greater".
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DetailLevel {
    Far = 0,
    Medium = 1,
    Near = 2,
    Closeup = 3,
}

impl DetailLevel {
    /// All levels, coarsest first.
    pub const ALL: [DetailLevel; 4] = [
        DetailLevel::Far,
        DetailLevel::Medium,
        DetailLevel::Near,
        DetailLevel::Closeup,
    ];

    /// Number of detail levels.
    pub const COUNT: usize = 4;

    /// The coarsest level.
    pub const COARSEST: DetailLevel = DetailLevel::Far;

    /// The finest level.
    pub const FINEST: DetailLevel = DetailLevel::Closeup;

    /// Index of this level in [`DetailLevel::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Level for an index, clamped to the valid range.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index.min(Self::COUNT - 1)]
    }

    /// The next finer level, if any.
    pub fn finer(self) -> Option<Self> {
        match self {
            DetailLevel::Far => Some(DetailLevel::Medium),
            DetailLevel::Medium => Some(DetailLevel::Near),
            DetailLevel::Near => Some(DetailLevel::Closeup),
            DetailLevel::Closeup => None,
        }
    }

    /// The next coarser level, if any.
    pub fn coarser(self) -> Option<Self> {
        match self {
            DetailLevel::Far => None,
            DetailLevel::Medium => Some(DetailLevel::Far),
            DetailLevel::Near => Some(DetailLevel::Medium),
            DetailLevel::Closeup => Some(DetailLevel::Near),
        }
    }

    /// Move at most one step from `self` toward `target`.
    pub fn step_toward(self, target: DetailLevel) -> DetailLevel {
        match self.cmp(&target) {
            std::cmp::Ordering::Less => self.finer().unwrap_or(self),
            std::cmp::Ordering::Greater => self.coarser().unwrap_or(self),
            std::cmp::Ordering::Equal => self,
        }
    }

    /// Number of steps between two levels.
    pub fn steps_between(self, other: DetailLevel) -> usize {
        self.index().abs_diff(other.index())
    }

    /// Lower-case name used in logs and config files.
    pub fn name(self) -> &'static str {
        match self {
            DetailLevel::Far => "far",
            DetailLevel::Medium => "medium",
            DetailLevel::Near => "near",
            DetailLevel::Closeup => "closeup",
        }
    }
}

impl std::fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
