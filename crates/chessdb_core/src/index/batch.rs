//! Atomic groups of index mutations.

use crate::entity::Entity;
use crate::error::CoreResult;
use crate::node::{NodeMetadata, NodeStore};
use crate::transaction::{StagedChanges, TransactionOverlay};
use crate::tree;
use crate::types::EntityId;
use std::collections::BTreeSet;

/// Mutations staged against one index, committed all-or-nothing.
///
/// Obtained through [`EntityIndex::batch`](crate::EntityIndex::batch).
/// Reads inside the batch see its own writes.
///
/// # Example
///
/// ```rust,ignore
/// index.batch(|txn| {
///     let carlsen = txn.add(Player::new("Carlsen", "Magnus"))?;
///     txn.delete(carlsen.id().unwrap())?;
///     Ok(())
/// })?;
/// ```
pub struct IndexTransaction<'a, E: Entity> {
    overlay: TransactionOverlay<'a, E, dyn NodeStore<E>>,
    touched: BTreeSet<EntityId>,
}

impl<'a, E: Entity> IndexTransaction<'a, E> {
    pub(crate) fn new(base: &'a (dyn NodeStore<E> + 'static)) -> Self {
        Self {
            overlay: TransactionOverlay::new(base),
            touched: BTreeSet::new(),
        }
    }

    /// Adds an entity, returning it with its assigned identity.
    pub fn add(&mut self, entity: E) -> CoreResult<E> {
        let stored = tree::insert(&mut self.overlay, entity)?;
        if let Some(id) = stored.id() {
            self.touched.insert(id);
        }
        Ok(stored)
    }

    /// Replaces the entity stored under `id`.
    ///
    /// Fails with [`CoreError::EntityNotFound`](crate::CoreError::EntityNotFound)
    /// when `id` was never allocated or has been deleted.
    pub fn put(&mut self, id: EntityId, entity: E) -> CoreResult<E> {
        let stored = tree::update(&mut self.overlay, id, entity)?;
        self.touched.insert(id);
        Ok(stored)
    }

    /// Deletes the entity stored under `id`. Returns false if there was none.
    pub fn delete(&mut self, id: EntityId) -> CoreResult<bool> {
        let removed = tree::delete(&mut self.overlay, id)?;
        if removed.is_some() {
            self.touched.insert(id);
        }
        Ok(removed.is_some())
    }

    /// Deletes `entity`: by identity when it has one, otherwise the first
    /// entity with an equal key.
    pub fn delete_entity(&mut self, entity: &E) -> CoreResult<bool> {
        if let Some(id) = entity.id() {
            return self.delete(id);
        }
        match tree::delete_by_key(&mut self.overlay, entity)? {
            Some(removed) => {
                if let Some(id) = removed.id() {
                    self.touched.insert(id);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Reads the entity stored under `id`.
    pub fn get(&self, id: EntityId) -> CoreResult<Option<E>> {
        if id.as_u32() >= self.overlay.metadata().capacity {
            return Ok(None);
        }
        let node = self.overlay.get_node(id)?;
        Ok(if node.is_live() { node.record } else { None })
    }

    /// Finds the single entity equal to `key`.
    pub fn get_by_key(&self, key: &E) -> CoreResult<Option<E>> {
        tree::find_unique(&self.overlay, key)
    }

    /// Finds any entity equal to `key`.
    pub fn get_any(&self, key: &E) -> CoreResult<Option<E>> {
        tree::find_any(&self.overlay, key)
    }

    /// Finds every entity equal to `key`, in order.
    pub fn get_all(&self, key: &E) -> CoreResult<Vec<E>> {
        tree::find_all(&self.overlay, key)
    }

    /// Number of live entities as seen by this batch.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.overlay.metadata().live_count
    }

    pub(crate) fn finish(self) -> Finished<E> {
        Finished {
            changes: self.overlay.into_changes(),
            touched: self.touched,
        }
    }
}

/// Result of a completed batch closure.
pub(crate) struct Finished<E> {
    pub(crate) changes: StagedChanges<E>,
    pub(crate) touched: BTreeSet<EntityId>,
}

impl<E: Entity> Finished<E> {
    /// Returns true if applying the changes would alter `base`.
    pub(crate) fn alters(&self, base: NodeMetadata) -> bool {
        !self.changes.is_empty() || self.changes.metadata() != base
    }
}
