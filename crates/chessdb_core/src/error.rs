//! Error types for ChessDB core.

use crate::types::EntityId;
use std::fmt;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in ChessDB core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] chessdb_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A node id outside the allocated id space was requested.
    #[error("node {id} was never allocated")]
    NodeNotFound {
        /// The requested id.
        id: EntityId,
    },

    /// An update targeted an id that holds no live entity.
    #[error("no live entity with id {id}")]
    EntityNotFound {
        /// The requested id.
        id: EntityId,
    },

    /// A unique key lookup matched more than one live entity.
    #[error("duplicate key: entities {first} and {second} compare equal")]
    DuplicateKey {
        /// First matching entity.
        first: EntityId,
        /// Second matching entity.
        second: EntityId,
    },

    /// The tree violates one of its structural invariants.
    #[error(
        "structural inconsistency at {}: {violation}",
        .node.map_or_else(|| "tree root".to_string(), |id| format!("node {id}"))
    )]
    StructuralInconsistency {
        /// The offending node, if the violation is tied to one.
        node: Option<EntityId>,
        /// The invariant that was violated.
        violation: Violation,
    },

    /// An iterator observed a structural change to its index.
    #[error("concurrent modification: iterator started at version {expected}, index is at {actual}")]
    ConcurrentModification {
        /// Version captured when the iterator was created.
        expected: u64,
        /// Version observed on the latest step.
        actual: u64,
    },

    /// Invalid file format or record encoding.
    #[error("invalid format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// Checksum mismatch detected.
    #[error("checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Expected checksum.
        expected: u32,
        /// Actual checksum.
        actual: u32,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },

    /// The index has been closed.
    #[error("index is closed")]
    IndexClosed,
}

impl CoreError {
    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates a structural inconsistency error for a specific node.
    pub fn inconsistent(node: EntityId, violation: Violation) -> Self {
        Self::StructuralInconsistency {
            node: Some(node),
            violation,
        }
    }

    /// Returns true for errors that mean "the data does not exist".
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NodeNotFound { .. } | Self::EntityNotFound { .. }
        )
    }

    /// Returns true if an iterator observed a structural change.
    #[must_use]
    pub fn is_concurrent_modification(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }
}

/// Invariants checked by structural validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// A tombstoned node is linked into the tree.
    TombstoneReachable,
    /// A child link points past the allocated id space.
    DanglingChild {
        /// The unallocated id the link points at.
        child: EntityId,
    },
    /// A node's key lies outside the bounds implied by its ancestors.
    OutOfOrder,
    /// The stored balance does not match the subtree heights.
    BalanceMismatch {
        /// Balance stored in the node.
        stored: i8,
        /// Balance recomputed from the subtrees.
        actual: i32,
    },
    /// The node's balance is outside `-1..=1`.
    Unbalanced {
        /// Balance stored in the node.
        balance: i8,
    },
    /// A node is reachable from itself.
    Cycle,
    /// The free list links a live node.
    FreeListCorrupt,
    /// The number of reachable live nodes differs from the stored count.
    CountMismatch {
        /// Count stored in the metadata.
        stored: u32,
        /// Count found by walking the tree.
        found: u32,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TombstoneReachable => write!(f, "tombstoned node is reachable"),
            Self::DanglingChild { child } => write!(f, "child link {child} was never allocated"),
            Self::OutOfOrder => write!(f, "key is out of order"),
            Self::BalanceMismatch { stored, actual } => {
                write!(f, "balance is {stored} but subtree heights give {actual}")
            }
            Self::Unbalanced { balance } => write!(f, "balance {balance} out of range"),
            Self::Cycle => write!(f, "node is its own descendant"),
            Self::FreeListCorrupt => write!(f, "free list links a live node"),
            Self::CountMismatch { stored, found } => {
                write!(f, "live count is {stored} but {found} nodes are reachable")
            }
        }
    }
}
