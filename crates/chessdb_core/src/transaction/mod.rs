//! Transactional staging of tree mutations.
//!
//! Every mutation of an index runs against a [`TransactionOverlay`]:
//! - **Atomicity**: nothing reaches the base store until the staged changes
//!   are applied; dropping them is a rollback
//! - **Isolation**: reads through the overlay see its own writes, never
//!   another overlay's
//! - **Read-through**: untouched nodes are read from the base store
//!
//! The overlay does not detect conflicting writers. Callers serialize
//! writers (the index holds its write lock for the whole overlay lifetime).

mod overlay;

pub use overlay::{StagedChanges, TransactionOverlay};
