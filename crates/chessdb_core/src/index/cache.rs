//! Identity-keyed record cache.

use crate::types::EntityId;
use std::collections::HashMap;
use tracing::trace;

/// Cache of deserialized records by identity.
///
/// Unbounded unless a capacity is set; once full, new records are simply
/// not cached. Entries are dropped when their entity is written or deleted.
#[derive(Debug)]
pub(crate) struct EntityCache<E> {
    entries: HashMap<EntityId, E>,
    capacity: Option<usize>,
}

impl<E: Clone> EntityCache<E> {
    pub(crate) fn new(capacity: Option<usize>) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
        }
    }

    pub(crate) fn get(&self, id: EntityId) -> Option<E> {
        self.entries.get(&id).cloned()
    }

    pub(crate) fn insert(&mut self, id: EntityId, record: E) {
        let full = self
            .capacity
            .is_some_and(|capacity| self.entries.len() >= capacity);
        if full && !self.entries.contains_key(&id) {
            trace!(%id, "cache full, not caching");
            return;
        }
        self.entries.insert(id, record);
    }

    pub(crate) fn remove(&mut self, id: EntityId) {
        self.entries.remove(&id);
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
