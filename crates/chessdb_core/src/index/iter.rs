//! Fail-fast iterators over an entity index.
//!
//! Iterators hold no lock between steps. Each step re-acquires the read lock
//! and compares the index version with the one captured at construction; on
//! a mismatch the step yields
//! [`CoreError::ConcurrentModification`](crate::CoreError::ConcurrentModification) and the
//! iterator ends.

use crate::entity::Entity;
use crate::error::CoreResult;
use crate::index::EntityIndex;
use crate::tree::{self, TreePath};
use crate::types::{EntityId, Version};
use std::cmp::Ordering;
use std::collections::VecDeque;

/// Iterates live entities in identity order.
///
/// Nodes are fetched in batches of
/// [`Config::scan_batch_size`](crate::Config::scan_batch_size); tombstones
/// are skipped.
pub struct IdentityIter<'a, E: Entity> {
    index: &'a EntityIndex<E>,
    version: Version,
    next_id: u32,
    batch_size: u32,
    buffer: VecDeque<E>,
    done: bool,
}

impl<'a, E: Entity> IdentityIter<'a, E> {
    pub(crate) fn new(index: &'a EntityIndex<E>, version: Version, start: EntityId) -> Self {
        let batch_size = u32::try_from(index.config().scan_batch_size)
            .unwrap_or(u32::MAX)
            .max(1);
        Self {
            index,
            version,
            next_id: start.as_u32(),
            batch_size,
            buffer: VecDeque::new(),
            done: false,
        }
    }

    fn step(&mut self) -> CoreResult<Option<E>> {
        let state = self.index.state.read();
        state.check_version(self.version)?;
        while self.buffer.is_empty() {
            let capacity = state.store.metadata().capacity;
            if self.next_id >= capacity {
                return Ok(None);
            }
            let end = self.next_id.saturating_add(self.batch_size).min(capacity);
            let nodes = state.store.get_node_range(self.next_id..end)?;
            self.buffer
                .extend(nodes.into_iter().filter(|n| n.is_live()).filter_map(|n| n.record));
            self.next_id = end;
        }
        Ok(self.buffer.pop_front())
    }
}

impl<E: Entity> Iterator for IdentityIter<'_, E> {
    type Item = CoreResult<E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// Iterates live entities in key order, ascending or descending.
pub struct OrderedIter<'a, E: Entity> {
    index: &'a EntityIndex<E>,
    version: Version,
    next: TreePath<E>,
    direction: Ordering,
    done: bool,
}

impl<'a, E: Entity> OrderedIter<'a, E> {
    pub(crate) fn ascending(index: &'a EntityIndex<E>, version: Version, start: TreePath<E>) -> Self {
        Self::new(index, version, start, Ordering::Greater)
    }

    pub(crate) fn descending(index: &'a EntityIndex<E>, version: Version, start: TreePath<E>) -> Self {
        Self::new(index, version, start, Ordering::Less)
    }

    fn new(index: &'a EntityIndex<E>, version: Version, start: TreePath<E>, direction: Ordering) -> Self {
        Self {
            index,
            version,
            next: start,
            direction,
            done: false,
        }
    }

    fn step(&mut self) -> CoreResult<Option<E>> {
        let state = self.index.state.read();
        state.check_version(self.version)?;
        let Some(node) = self.next.node() else {
            return Ok(None);
        };
        let record = node.record()?.clone();
        self.next = if self.direction == Ordering::Greater {
            tree::successor(&*state.store, &self.next)?
        } else {
            tree::predecessor(&*state.store, &self.next)?
        };
        Ok(Some(record))
    }
}

impl<E: Entity> Iterator for OrderedIter<'_, E> {
    type Item = CoreResult<E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
