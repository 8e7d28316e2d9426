//! AVL tree engine over a node store.
//!
//! The tree is an arena of nodes addressed by [`EntityId`](crate::EntityId);
//! every function here is written against [`NodeStore`](crate::node::NodeStore)
//! only, so it runs unchanged on the in-memory store, the paged store and a
//! transaction overlay.
//!
//! ## Ordering of equal keys
//!
//! Inserting a key equal to an existing one places it after the existing
//! run, so equal keys iterate in insertion order. Rotations preserve
//! in-order position but may leave equal keys on either side of each other,
//! which is why unique and all-matches lookups start from
//! [`lower_bound`] and walk forward rather than trusting the first hit of
//! [`tree_search`].
//!
//! ## Deleting a node with two children
//!
//! The in-order successor node is relinked into the vacated position
//! instead of copying its record over the target. Entity ids therefore
//! never change while an entity is live.

mod delete;
mod insert;
mod path;
mod rotate;
mod search;
mod validate;

pub use delete::{delete, delete_by_key, update};
pub use insert::insert;
pub use path::TreePath;
pub use search::{
    find_all, find_any, find_unique, first, floor, last, leftmost, locate, lower_bound,
    predecessor, rightmost, strict_floor, successor, tree_search, upper_bound,
};
pub use validate::validate;
