//! Node storage for the entity tree.
//!
//! A node store is an arena of fixed-size tree nodes addressed by dense
//! [`EntityId`]s, plus a small metadata block (root, live count, capacity and
//! free-list head). The tree engine is written only against the
//! [`NodeStore`] trait, so every backend here is interchangeable:
//!
//! - [`InMemoryNodeStore`]: a map of nodes, used for scratch stores and for
//!   indexes loaded fully into memory
//! - [`PagedNodeStore`]: fixed-size slots in a file (or any other
//!   `chessdb_storage` backend)
//! - [`crate::transaction::TransactionOverlay`]: a copy-on-write decorator
//!   over either of the above

mod memory;
mod paged;

pub use memory::InMemoryNodeStore;
pub use paged::{FileHeader, PagedNodeStore, RawNodeFile, RawSlot, HEADER_SIZE, SLOT_OVERHEAD};

use crate::entity::Entity;
use crate::error::{CoreError, CoreResult, Violation};
use crate::types::EntityId;
use std::ops::Range;

/// A tree node: one entity record plus its structural links.
#[derive(Debug, Clone)]
pub struct Node<E> {
    /// Slot id; also the identity of the stored entity.
    pub id: EntityId,
    /// The stored record, `None` once tombstoned.
    pub record: Option<E>,
    /// Left child. For tombstones this links the next free id.
    pub left: Option<EntityId>,
    /// Right child.
    pub right: Option<EntityId>,
    /// `height(right) - height(left)`.
    pub balance: i8,
    /// Whether the node has been deleted.
    pub tombstoned: bool,
}

impl<E> Node<E> {
    /// Creates a live leaf node.
    #[must_use]
    pub fn new(id: EntityId, record: E) -> Self {
        Self {
            id,
            record: Some(record),
            left: None,
            right: None,
            balance: 0,
            tombstoned: false,
        }
    }

    /// Creates a tombstone that threads the free list through `left`.
    #[must_use]
    pub fn tombstone(id: EntityId, next_free: Option<EntityId>) -> Self {
        Self {
            id,
            record: None,
            left: next_free,
            right: None,
            balance: 0,
            tombstoned: true,
        }
    }

    /// Returns true if the node holds a live record.
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.tombstoned && self.record.is_some()
    }

    /// Returns the record, failing if the node is a tombstone.
    pub fn record(&self) -> CoreResult<&E> {
        match &self.record {
            Some(record) if !self.tombstoned => Ok(record),
            _ => Err(CoreError::inconsistent(
                self.id,
                Violation::TombstoneReachable,
            )),
        }
    }
}

/// Metadata stored alongside the nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeMetadata {
    /// Root of the tree, `None` when empty.
    pub root: Option<EntityId>,
    /// Number of live (non-tombstoned) nodes.
    pub live_count: u32,
    /// Number of allocated node slots. Never shrinks.
    pub capacity: u32,
    /// Head of the tombstone free list.
    pub free_list_head: Option<EntityId>,
}

/// Storage contract for tree nodes.
///
/// # Invariants
///
/// - `get_node` fails with [`CoreError::NodeNotFound`] for ids at or beyond
///   `metadata().capacity` and returns tombstoned nodes as-is
/// - `put_node` may write ids beyond the current capacity; the capacity is
///   only moved by `set_metadata`
/// - Implementations never interpret records beyond (de)serializing them
pub trait NodeStore<E: Entity>: Send + Sync {
    /// Reads one node.
    fn get_node(&self, id: EntityId) -> CoreResult<Node<E>>;

    /// Reads the nodes with ids in `range`, clamped to the capacity.
    ///
    /// Intended for sequential identity-order scans of committed data.
    fn get_node_range(&self, range: Range<u32>) -> CoreResult<Vec<Node<E>>>;

    /// Writes one node.
    fn put_node(&mut self, node: Node<E>) -> CoreResult<()>;

    /// Returns the current metadata.
    fn metadata(&self) -> NodeMetadata;

    /// Replaces the metadata.
    fn set_metadata(&mut self, metadata: NodeMetadata) -> CoreResult<()>;

    /// Builds a fresh leaf node for `record`.
    fn create_node(&self, id: EntityId, record: E) -> Node<E> {
        Node::new(id, record)
    }

    /// Flushes and releases the store.
    fn close(&mut self) -> CoreResult<()>;
}

/// Copies every node and then the metadata from `source` into `target`.
///
/// Used to load a file into memory and to duplicate an index into a new file.
pub fn copy_nodes<E, S, T>(source: &S, target: &mut T, batch_size: usize) -> CoreResult<()>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
    T: NodeStore<E> + ?Sized,
{
    let metadata = source.metadata();
    let batch = batch_size.max(1) as u32;
    let mut start = 0u32;
    while start < metadata.capacity {
        let end = start.saturating_add(batch).min(metadata.capacity);
        for node in source.get_node_range(start..end)? {
            target.put_node(node)?;
        }
        start = end;
    }
    target.set_metadata(metadata)
}
