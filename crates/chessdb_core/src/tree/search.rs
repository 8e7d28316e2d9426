//! Key searches, bounds and in-order stepping.

use crate::entity::Entity;
use crate::error::{CoreError, CoreResult, Violation};
use crate::node::{Node, NodeStore};
use crate::tree::TreePath;
use crate::types::EntityId;
use std::cmp::Ordering;

/// Which nodes a bound search accepts as candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    /// First node `>= key`.
    Lower,
    /// First node `> key`.
    Upper,
    /// Last node `<= key`.
    Floor,
    /// Last node `< key`.
    StrictFloor,
}

/// Descends from the root, stopping at the first node equal to `key`.
///
/// The last frame holds the final comparison; when it is not `Equal` the
/// path ends at the node `key` would hang under.
pub fn tree_search<E, S>(store: &S, key: &E) -> CoreResult<TreePath<E>>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
{
    let mut path = TreePath::empty();
    let mut cursor = store.metadata().root;
    while let Some(id) = cursor {
        let node = store.get_node(id)?;
        let ord = key.compare(node.record()?);
        cursor = match ord {
            Ordering::Less => node.left,
            Ordering::Greater => node.right,
            Ordering::Equal => None,
        };
        path = path.push(ord, node);
    }
    Ok(path)
}

/// Path to the first node `>= key`, or an empty path.
pub fn lower_bound<E, S>(store: &S, key: &E) -> CoreResult<TreePath<E>>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
{
    bound(store, key, Bound::Lower)
}

/// Path to the first node `> key`, or an empty path.
pub fn upper_bound<E, S>(store: &S, key: &E) -> CoreResult<TreePath<E>>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
{
    bound(store, key, Bound::Upper)
}

/// Path to the last node `<= key`, or an empty path.
pub fn floor<E, S>(store: &S, key: &E) -> CoreResult<TreePath<E>>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
{
    bound(store, key, Bound::Floor)
}

/// Path to the last node `< key`, or an empty path.
pub fn strict_floor<E, S>(store: &S, key: &E) -> CoreResult<TreePath<E>>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
{
    bound(store, key, Bound::StrictFloor)
}

fn bound<E, S>(store: &S, key: &E, bound: Bound) -> CoreResult<TreePath<E>>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
{
    let mut path = TreePath::empty();
    let mut best = TreePath::empty();
    let mut cursor = store.metadata().root;
    while let Some(id) = cursor {
        let node = store.get_node(id)?;
        let ord = key.compare(node.record()?);
        let (candidate, direction) = match bound {
            Bound::Lower => (ord != Ordering::Greater, go_left_if(ord != Ordering::Greater)),
            Bound::Upper => (ord == Ordering::Less, go_left_if(ord == Ordering::Less)),
            Bound::Floor => (ord != Ordering::Less, go_left_if(ord == Ordering::Less)),
            Bound::StrictFloor => (ord == Ordering::Greater, go_left_if(ord != Ordering::Greater)),
        };
        cursor = if direction == Ordering::Less {
            node.left
        } else {
            node.right
        };
        path = path.push(direction, node);
        if candidate {
            best = path.clone();
        }
    }
    Ok(best)
}

fn go_left_if(left: bool) -> Ordering {
    if left {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

/// Extends `path` down the left spine starting at `start`.
pub fn leftmost<E, S>(store: &S, path: TreePath<E>, start: Option<EntityId>) -> CoreResult<TreePath<E>>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
{
    spine(store, path, start, Ordering::Less)
}

/// Extends `path` down the right spine starting at `start`.
pub fn rightmost<E, S>(store: &S, path: TreePath<E>, start: Option<EntityId>) -> CoreResult<TreePath<E>>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
{
    spine(store, path, start, Ordering::Greater)
}

fn spine<E, S>(
    store: &S,
    mut path: TreePath<E>,
    start: Option<EntityId>,
    direction: Ordering,
) -> CoreResult<TreePath<E>>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
{
    let mut cursor = start;
    while let Some(id) = cursor {
        let node = store.get_node(id)?;
        cursor = if direction == Ordering::Less {
            node.left
        } else {
            node.right
        };
        path = path.push(direction, node);
    }
    Ok(path)
}

/// Path to the smallest node.
pub fn first<E, S>(store: &S) -> CoreResult<TreePath<E>>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
{
    leftmost(store, TreePath::empty(), store.metadata().root)
}

/// Path to the largest node.
pub fn last<E, S>(store: &S) -> CoreResult<TreePath<E>>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
{
    rightmost(store, TreePath::empty(), store.metadata().root)
}

/// Path to the in-order successor of the node `path` ends at.
///
/// Either the leftmost node of the right subtree, or the nearest ancestor
/// reached by a left step. Empty when `path` ends at the largest node.
pub fn successor<E, S>(store: &S, path: &TreePath<E>) -> CoreResult<TreePath<E>>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
{
    step(store, path, Ordering::Greater)
}

/// Path to the in-order predecessor of the node `path` ends at.
pub fn predecessor<E, S>(store: &S, path: &TreePath<E>) -> CoreResult<TreePath<E>>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
{
    step(store, path, Ordering::Less)
}

fn step<E, S>(store: &S, path: &TreePath<E>, toward: Ordering) -> CoreResult<TreePath<E>>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
{
    let Some(node) = path.node() else {
        return Ok(TreePath::empty());
    };
    let child = if toward == Ordering::Greater {
        node.right
    } else {
        node.left
    };
    if let Some(child) = child {
        let down = path.turn(toward);
        return spine(store, down, Some(child), toward.reverse());
    }

    // Climb until we leave a subtree from the side opposite to `toward`.
    let mut cursor = path.parent();
    while let Some(direction) = cursor.direction() {
        if direction == toward.reverse() {
            return Ok(cursor);
        }
        cursor = cursor.parent();
    }
    Ok(TreePath::empty())
}

/// Finds the single node equal to `key`.
///
/// Fails with [`CoreError::DuplicateKey`] when two or more live nodes match.
pub fn find_unique<E, S>(store: &S, key: &E) -> CoreResult<Option<E>>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
{
    let start = lower_bound(store, key)?;
    let Some(first) = matching(&start, key)? else {
        return Ok(None);
    };
    let next = successor(store, &start)?;
    if let Some(second) = matching(&next, key)? {
        return Err(CoreError::DuplicateKey {
            first: first.id,
            second: second.id,
        });
    }
    Ok(first.record)
}

/// Finds any node equal to `key`; the first one met on the way down.
pub fn find_any<E, S>(store: &S, key: &E) -> CoreResult<Option<E>>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
{
    let path = tree_search(store, key)?;
    if !path.is_hit() {
        return Ok(None);
    }
    Ok(path.node().and_then(|node| node.record.clone()))
}

/// Finds every node equal to `key`, in ascending order.
pub fn find_all<E, S>(store: &S, key: &E) -> CoreResult<Vec<E>>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
{
    let mut found = Vec::new();
    let mut path = lower_bound(store, key)?;
    while let Some(node) = matching(&path, key)? {
        if let Some(record) = node.record {
            found.push(record);
        }
        path = successor(store, &path)?;
    }
    Ok(found)
}

/// Path to the node with identity `id`, or an empty path if no live node
/// holds it.
///
/// Starts at the first node equal to the stored key and walks the run of
/// equal keys until the id matches.
pub fn locate<E, S>(store: &S, id: EntityId) -> CoreResult<TreePath<E>>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
{
    if id.as_u32() >= store.metadata().capacity {
        return Ok(TreePath::empty());
    }
    let target = store.get_node(id)?;
    if !target.is_live() {
        return Ok(TreePath::empty());
    }
    let key = target.record()?;
    let mut path = lower_bound(store, key)?;
    while let Some(node) = matching(&path, key)? {
        if node.id == id {
            return Ok(path);
        }
        path = successor(store, &path)?;
    }
    Err(CoreError::inconsistent(id, Violation::OutOfOrder))
}

/// Returns the path's node if its record compares equal to `key`.
fn matching<E: Entity>(path: &TreePath<E>, key: &E) -> CoreResult<Option<Node<E>>> {
    match path.node() {
        Some(node) if key.compare(node.record()?) == Ordering::Equal => Ok(Some(node.clone())),
        _ => Ok(None),
    }
}
