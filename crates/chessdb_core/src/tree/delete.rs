//! Deletion and in-place updates.

use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::node::{Node, NodeMetadata, NodeStore};
use crate::tree::insert::{link, set_child};
use crate::tree::rotate::rebalance;
use crate::tree::search::{locate, lower_bound};
use crate::tree::TreePath;
use crate::types::EntityId;
use std::cmp::Ordering;

/// Deletes the entity with identity `id`.
///
/// Returns the removed record, or `None` if no live entity holds the id.
/// The id is tombstoned and pushed onto the free list.
pub fn delete<E, S>(store: &mut S, id: EntityId) -> CoreResult<Option<E>>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
{
    let path = locate(store, id)?;
    remove_at(store, &path)
}

/// Deletes the first entity equal to `key`.
pub fn delete_by_key<E, S>(store: &mut S, key: &E) -> CoreResult<Option<E>>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
{
    let path = lower_bound(store, key)?;
    match path.node() {
        Some(node) if key.compare(node.record()?) == Ordering::Equal => remove_at(store, &path),
        _ => Ok(None),
    }
}

/// Replaces the record stored under `id`.
///
/// A record that still compares equal to the old one is rewritten in place.
/// Otherwise the node is unlinked and linked again under its new key; it
/// keeps its id and never visits the free list.
pub fn update<E, S>(store: &mut S, id: EntityId, record: E) -> CoreResult<E>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
{
    let path = locate(store, id)?;
    let Some(current) = path.node().cloned() else {
        return Err(CoreError::EntityNotFound { id });
    };
    let record = record.with_new_id(id);

    if record.compare(current.record()?) == Ordering::Equal {
        let mut node = current;
        node.record = Some(record.clone());
        store.put_node(node)?;
        return Ok(record);
    }

    let mut meta = store.metadata();
    unlink(store, &mut meta, &path)?;
    let node = store.create_node(id, record.clone());
    link(store, &mut meta, node)?;
    store.set_metadata(meta)?;
    Ok(record)
}

fn remove_at<E, S>(store: &mut S, path: &TreePath<E>) -> CoreResult<Option<E>>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
{
    if path.is_empty() {
        return Ok(None);
    }
    let mut meta = store.metadata();
    let target = unlink(store, &mut meta, path)?;
    store.put_node(Node::tombstone(target.id, meta.free_list_head))?;
    meta.free_list_head = Some(target.id);
    meta.live_count = meta.live_count.saturating_sub(1);
    store.set_metadata(meta)?;
    Ok(target.record)
}

/// Detaches the node `path` ends at and rebalances up to the root.
///
/// A node with two children is replaced by its in-order successor: the
/// successor node itself moves into the vacated position, taking over the
/// target's links and balance, so every surviving entity keeps its id.
///
/// Returns the detached node as it was before unlinking.
pub(crate) fn unlink<E, S>(
    store: &mut S,
    meta: &mut NodeMetadata,
    path: &TreePath<E>,
) -> CoreResult<Node<E>>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
{
    let mut frames = path.frames();
    let Some((_, target)) = frames.pop() else {
        return Err(CoreError::invalid_operation("cannot unlink an empty path"));
    };

    let replacement = match (target.left, target.right) {
        (Some(_), Some(right)) => {
            let slot = frames.len();
            frames.push((Ordering::Greater, target.clone()));
            let mut cursor = store.get_node(right)?;
            while let Some(left) = cursor.left {
                let next = store.get_node(left)?;
                frames.push((Ordering::Less, cursor));
                cursor = next;
            }
            let replacement = cursor.right;
            let mut moved = cursor;
            moved.left = target.left;
            moved.right = target.right;
            moved.balance = target.balance;
            frames[slot].1 = moved;
            replacement
        }
        (left, right) => left.or(right),
    };

    let mut child = replacement;
    let mut shrunk = true;
    while let Some((direction, mut parent)) = frames.pop() {
        set_child(&mut parent, direction, child);
        if shrunk {
            parent.balance += if direction == Ordering::Less { 1 } else { -1 };
            match parent.balance {
                0 => {}
                1 | -1 => shrunk = false,
                _ => {
                    let rebalanced = rebalance(store, parent, &[])?;
                    parent = rebalanced.root;
                    shrunk = rebalanced.shrunk;
                }
            }
        }
        child = Some(parent.id);
        store.put_node(parent)?;
    }
    meta.root = child;
    Ok(target)
}
