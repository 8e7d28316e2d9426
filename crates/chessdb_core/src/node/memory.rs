//! In-memory node store.

use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::node::{Node, NodeMetadata, NodeStore};
use crate::types::EntityId;
use std::collections::HashMap;
use std::ops::Range;

/// A node store kept entirely in memory.
///
/// Used for fresh scratch indexes and for the "load fully into memory" mode,
/// where a file's nodes are bulk-copied in and later written back out.
#[derive(Debug)]
pub struct InMemoryNodeStore<E> {
    nodes: HashMap<EntityId, Node<E>>,
    metadata: NodeMetadata,
}

impl<E> Default for InMemoryNodeStore<E> {
    fn default() -> Self {
        Self {
            nodes: HashMap::new(),
            metadata: NodeMetadata::default(),
        }
    }
}

impl<E> InMemoryNodeStore<E> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of node slots held, tombstones included.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.nodes.len()
    }
}

impl<E: Entity> NodeStore<E> for InMemoryNodeStore<E> {
    fn get_node(&self, id: EntityId) -> CoreResult<Node<E>> {
        if id.as_u32() >= self.metadata.capacity {
            return Err(CoreError::NodeNotFound { id });
        }
        self.nodes
            .get(&id)
            .cloned()
            .ok_or(CoreError::NodeNotFound { id })
    }

    fn get_node_range(&self, range: Range<u32>) -> CoreResult<Vec<Node<E>>> {
        let end = range.end.min(self.metadata.capacity);
        (range.start..end)
            .map(|i| self.get_node(EntityId::new(i)))
            .collect()
    }

    fn put_node(&mut self, node: Node<E>) -> CoreResult<()> {
        self.nodes.insert(node.id, node);
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
        Ok(())
    }
}
