//! Core type definitions for ChessDB.

use std::fmt;

/// Identity of an entity and of the tree node that stores it.
///
/// Ids are dense: a store with capacity `n` has allocated exactly the ids
/// `0..n`. An id survives deletion as a tombstone and may be handed out again
/// by a later insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u32);

impl EntityId {
    /// Creates a new entity id.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw id value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns the slot index for this id.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Decodes an on-disk link, where `-1` means "no node".
    #[must_use]
    pub const fn from_link(link: i32) -> Option<Self> {
        if link < 0 {
            None
        } else {
            Some(Self(link as u32))
        }
    }

    /// Encodes an optional id as an on-disk link.
    #[must_use]
    pub const fn to_link(id: Option<Self>) -> i32 {
        match id {
            Some(id) => id.0 as i32,
            None => -1,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for EntityId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Structural version of an index.
///
/// Bumped on every committed mutation. Iterators remember the version they
/// started at and refuse to continue once it moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version(pub u64);

impl Version {
    /// Returns the raw version value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next version.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}
