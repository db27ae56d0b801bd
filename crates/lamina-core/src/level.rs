//! Level identifiers
//!
//! A level is the depth of a transform layer in the stack. Levels are small,
//! start at 1 for the outermost transform, and grow with nesting.

use std::fmt;

/// Transform-stack depth a wrapper belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Level(pub u32);

impl Level {
    /// The level directly above this one.
    pub fn next(self) -> Level {
        Level(self.0 + 1)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Level {
    fn from(raw: u32) -> Self {
        Level(raw)
    }
}

impl From<Level> for u32 {
    fn from(level: Level) -> Self {
        level.0
    }
}
