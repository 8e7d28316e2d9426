//! Insertion and id allocation.

use crate::entity::Entity;
use crate::error::{CoreError, CoreResult, Violation};
use crate::node::{Node, NodeMetadata, NodeStore};
use crate::tree::rotate::rebalance;
use crate::tree::TreePath;
use crate::types::EntityId;
use std::cmp::Ordering;

/// Largest id a link can encode.
const MAX_CAPACITY: u32 = i32::MAX as u32;

/// Inserts `record`, returning it with its assigned identity.
///
/// The id comes off the free list when one is available, otherwise the id
/// space grows by one. Keys equal to an existing key are placed after it.
pub fn insert<E, S>(store: &mut S, record: E) -> CoreResult<E>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
{
    let mut meta = store.metadata();
    let id = allocate(store, &mut meta)?;
    let record = record.with_new_id(id);
    let node = store.create_node(id, record.clone());
    link(store, &mut meta, node)?;
    meta.live_count += 1;
    store.set_metadata(meta)?;
    Ok(record)
}

/// Takes an id off the free list or extends the id space.
pub(crate) fn allocate<E, S>(store: &S, meta: &mut NodeMetadata) -> CoreResult<EntityId>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
{
    if let Some(free) = meta.free_list_head {
        let tombstone = store.get_node(free)?;
        if !tombstone.tombstoned {
            return Err(CoreError::inconsistent(free, Violation::FreeListCorrupt));
        }
        meta.free_list_head = tombstone.left;
        return Ok(free);
    }
    if meta.capacity >= MAX_CAPACITY {
        return Err(CoreError::invalid_operation("entity id space exhausted"));
    }
    let id = EntityId::new(meta.capacity);
    meta.capacity += 1;
    Ok(id)
}

/// Hangs a detached leaf `node` into the tree rooted at `meta.root`.
///
/// Walks back up recomputing balances. The first ancestor pushed out of
/// range is rotated, which restores the subtree's old height, so nothing
/// above it changes except the link to the new subtree root.
pub(crate) fn link<E, S>(store: &mut S, meta: &mut NodeMetadata, node: Node<E>) -> CoreResult<()>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
{
    let mut frames = insertion_path(store, meta.root, node.record()?)?.frames();

    let mut child = node;
    let mut below: Option<Node<E>> = None;
    let mut grew = true;
    while let Some((direction, mut parent)) = frames.pop() {
        store.put_node(child.clone())?;
        let position = parent.id;
        set_child(&mut parent, direction, Some(child.id));
        if grew {
            parent.balance += if direction == Ordering::Less { -1 } else { 1 };
            if parent.balance == 0 {
                grew = false;
            } else if parent.balance.abs() > 1 {
                let known: Vec<&Node<E>> = std::iter::once(&child).chain(below.as_ref()).collect();
                parent = rebalance(store, parent, &known)?.root;
                grew = false;
            }
        }
        let rotated = parent.id != position;
        below = Some(child);
        child = parent;
        if !grew && !rotated {
            return store.put_node(child);
        }
    }
    meta.root = Some(child.id);
    store.put_node(child)
}

/// Descends to the spot `key` hangs under, sending ties right.
fn insertion_path<E, S>(store: &S, root: Option<EntityId>, key: &E) -> CoreResult<TreePath<E>>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
{
    let mut path = TreePath::empty();
    let mut cursor = root;
    while let Some(id) = cursor {
        let node = store.get_node(id)?;
        let direction = match key.compare(node.record()?) {
            Ordering::Less => Ordering::Less,
            _ => Ordering::Greater,
        };
        cursor = if direction == Ordering::Less {
            node.left
        } else {
            node.right
        };
        path = path.push(direction, node);
    }
    Ok(path)
}

/// Points the child link on the `direction` side at `child`.
pub(crate) fn set_child<E>(node: &mut Node<E>, direction: Ordering, child: Option<EntityId>) {
    if direction == Ordering::Less {
        node.left = child;
    } else {
        node.right = child;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::InMemoryNodeStore;
    use crate::test_support::Name;
    use crate::tree::{first, successor, validate};

    fn in_order(store: &InMemoryNodeStore<Name>) -> Vec<(String, u32)> {
        let mut out = Vec::new();
        let mut path = first(store).unwrap();
        while let Some(node) = path.node() {
            out.push((node.record().unwrap().name.clone(), node.id.as_u32()));
            path = successor(store, &path).unwrap();
        }
        out
    }

    #[test]
    fn first_insert_becomes_root() {
        let mut store = InMemoryNodeStore::new();
        let stored = insert(&mut store, Name::new("Kasparov")).unwrap();

        assert_eq!(stored.id, Some(EntityId::new(0)));
        let meta = store.metadata();
        assert_eq!(meta.root, Some(EntityId::new(0)));
        assert_eq!(meta.live_count, 1);
        assert_eq!(meta.capacity, 1);
    }

    #[test]
    fn ascending_inserts_stay_balanced() {
        let mut store = InMemoryNodeStore::new();
        for name in ["a", "b", "c", "d", "e", "f", "g"] {
            insert(&mut store, Name::new(name)).unwrap();
            validate(&store).unwrap();
        }
        // A perfect tree of seven nodes is rooted at the median.
        assert_eq!(store.metadata().root, Some(EntityId::new(3)));
        let names: Vec<_> = in_order(&store).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b", "c", "d", "e", "f", "g"]);
    }

    #[test]
    fn double_rotations() {
        for order in [["c", "a", "b"], ["a", "c", "b"]] {
            let mut store = InMemoryNodeStore::new();
            for name in order {
                insert(&mut store, Name::new(name)).unwrap();
            }
            validate(&store).unwrap();
            let root = store.get_node(store.metadata().root.unwrap()).unwrap();
            assert_eq!(root.record().unwrap().name, "b");
        }
    }

    #[test]
    fn ties_go_after_existing_keys() {
        let mut store = InMemoryNodeStore::new();
        for name in ["m", "m", "a", "m", "z"] {
            insert(&mut store, Name::new(name)).unwrap();
        }
        validate(&store).unwrap();
        let order = in_order(&store);
        let m_ids: Vec<u32> = order
            .iter()
            .filter(|(n, _)| n == "m")
            .map(|(_, id)| *id)
            .collect();
        assert_eq!(m_ids, vec![0, 1, 3]);
    }

    #[test]
    fn allocation_prefers_free_list() {
        let mut store: InMemoryNodeStore<Name> = InMemoryNodeStore::new();
        store.put_node(Node::tombstone(EntityId::new(0), None)).unwrap();
        store.put_node(Node::tombstone(EntityId::new(1), Some(EntityId::new(0)))).unwrap();
        let mut meta = NodeMetadata {
            capacity: 2,
            free_list_head: Some(EntityId::new(1)),
            ..NodeMetadata::default()
        };
        store.set_metadata(meta).unwrap();

        assert_eq!(allocate(&store, &mut meta).unwrap(), EntityId::new(1));
        assert_eq!(allocate(&store, &mut meta).unwrap(), EntityId::new(0));
        assert_eq!(allocate(&store, &mut meta).unwrap(), EntityId::new(2));
        assert_eq!(meta.capacity, 3);
        assert_eq!(meta.free_list_head, None);
    }

    #[test]
    fn allocation_rejects_live_free_list_entry() {
        let mut store: InMemoryNodeStore<Name> = InMemoryNodeStore::new();
        store.put_node(Node::new(EntityId::new(0), Name::new("live"))).unwrap();
        let mut meta = NodeMetadata {
            capacity: 1,
            free_list_head: Some(EntityId::new(0)),
            ..NodeMetadata::default()
        };
        store.set_metadata(meta).unwrap();
        assert!(matches!(
            allocate(&store, &mut meta),
            Err(CoreError::StructuralInconsistency {
                violation: Violation::FreeListCorrupt,
                ..
            })
        ));
    }
}
