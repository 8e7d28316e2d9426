//! Copy-on-write overlay over a node store.

use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::node::{Node, NodeMetadata, NodeStore};
use crate::types::EntityId;
use std::collections::BTreeMap;
use std::ops::Range;

/// A private, copy-on-write view of a node store.
///
/// Writes land in a staged map and a cloned metadata block; reads check the
/// staged map first and fall through to the base store. The base store is
/// never touched: call [`TransactionOverlay::into_changes`] and
/// [`StagedChanges::apply`] to commit, or drop the overlay to roll back.
pub struct TransactionOverlay<'a, E, S: ?Sized> {
    base: &'a S,
    staged: BTreeMap<EntityId, Node<E>>,
    metadata: NodeMetadata,
}

impl<'a, E: Entity, S: NodeStore<E> + ?Sized> TransactionOverlay<'a, E, S> {
    /// Starts an overlay over `base`, snapshotting its metadata.
    pub fn new(base: &'a S) -> Self {
        Self {
            base,
            staged: BTreeMap::new(),
            metadata: base.metadata(),
        }
    }

    /// Returns the number of staged nodes.
    #[must_use]
    pub fn staged_count(&self) -> usize {
        self.staged.len()
    }

    /// Returns true if anything differs from the base store.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.staged.is_empty() || self.metadata != self.base.metadata()
    }

    /// Releases the base store and returns the staged changes.
    #[must_use]
    pub fn into_changes(self) -> StagedChanges<E> {
        StagedChanges {
            nodes: self.staged,
            metadata: self.metadata,
        }
    }
}

impl<E: Entity, S: NodeStore<E> + ?Sized> NodeStore<E> for TransactionOverlay<'_, E, S> {
    fn get_node(&self, id: EntityId) -> CoreResult<Node<E>> {
        if let Some(node) = self.staged.get(&id) {
            return Ok(node.clone());
        }
        if id.as_u32() >= self.metadata.capacity {
            return Err(CoreError::NodeNotFound { id });
        }
        self.base.get_node(id)
    }

    fn get_node_range(&self, _range: Range<u32>) -> CoreResult<Vec<Node<E>>> {
        Err(CoreError::invalid_operation(
            "range reads are not supported inside a transaction",
        ))
    }

    fn put_node(&mut self, node: Node<E>) -> CoreResult<()> {
        self.staged.insert(node.id, node);
        Ok(())
    }

    fn metadata(&self) -> NodeMetadata {
        self.metadata
    }

    fn set_metadata(&mut self, metadata: NodeMetadata) -> CoreResult<()> {
        self.metadata = metadata;
        Ok(())
    }

    fn close(&mut self) -> CoreResult<()> {
        self.staged.clear();
        self.metadata = self.base.metadata();
        Ok(())
    }
}

/// Node writes and final metadata produced by a transaction.
#[derive(Debug)]
pub struct StagedChanges<E> {
    nodes: BTreeMap<EntityId, Node<E>>,
    metadata: NodeMetadata,
}

impl<E: Entity> StagedChanges<E> {
    /// Number of staged nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if no node was staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The metadata the base store will hold after `apply`.
    #[must_use]
    pub fn metadata(&self) -> NodeMetadata {
        self.metadata
    }

    /// Ids of the staged nodes, ascending.
    pub fn node_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.nodes.keys().copied()
    }

    /// Writes every staged node in ascending id order, then the metadata.
    ///
    /// Returns the number of nodes written.
    pub fn apply<S: NodeStore<E> + ?Sized>(self, base: &mut S) -> CoreResult<usize> {
        let written = self.nodes.len();
        for node in self.nodes.into_values() {
            base.put_node(node)?;
        }
        base.set_metadata(self.metadata)?;
        Ok(written)
    }
}
