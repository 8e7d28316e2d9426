//! AVL rotations.
//!
//! Balance factors are `height(right) - height(left)`. Rotations operate on
//! detached node values: the caller hands over the out-of-balance node, the
//! rotation fetches the heavy child (and grandchild for double rotations),
//! writes every node that moved below the new subtree root, and returns the
//! new root unwritten so the caller can link it into its parent.

use crate::entity::Entity;
use crate::error::{CoreError, CoreResult, Violation};
use crate::node::{Node, NodeStore};
use crate::types::EntityId;
use tracing::trace;

/// Outcome of rebalancing one subtree.
pub(crate) struct Rebalanced<E> {
    /// New subtree root, not yet written.
    pub root: Node<E>,
    /// Whether the subtree is now one level shorter than before the rotation.
    pub shrunk: bool,
}

/// Rebalances `node`, whose balance is `+2` or `-2`.
///
/// `known` holds freshly modified nodes that may not be readable from the
/// store yet; they take precedence over stored copies.
pub(crate) fn rebalance<E, S>(
    store: &mut S,
    node: Node<E>,
    known: &[&Node<E>],
) -> CoreResult<Rebalanced<E>>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
{
    match node.balance {
        2 => {
            let heavy = fetch(store, node.id, node.right, known)?;
            if heavy.balance >= 0 {
                rotate_left(store, node, heavy)
            } else {
                let inner = fetch(store, heavy.id, heavy.left, known)?;
                rotate_right_left(store, node, heavy, inner)
            }
        }
        -2 => {
            let heavy = fetch(store, node.id, node.left, known)?;
            if heavy.balance <= 0 {
                rotate_right(store, node, heavy)
            } else {
                let inner = fetch(store, heavy.id, heavy.right, known)?;
                rotate_left_right(store, node, heavy, inner)
            }
        }
        balance => Err(CoreError::inconsistent(node.id, Violation::Unbalanced { balance })),
    }
}

fn fetch<E, S>(
    store: &S,
    parent: EntityId,
    id: Option<EntityId>,
    known: &[&Node<E>],
) -> CoreResult<Node<E>>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
{
    // A heavy side always has a child.
    let id = id.ok_or_else(|| {
        CoreError::inconsistent(parent, Violation::Unbalanced { balance: 2 })
    })?;
    match known.iter().find(|node| node.id == id) {
        Some(node) => Ok((*node).clone()),
        None => store.get_node(id),
    }
}

/// Single left rotation around `x`, whose right child is `z`.
fn rotate_left<E, S>(store: &mut S, mut x: Node<E>, mut z: Node<E>) -> CoreResult<Rebalanced<E>>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
{
    trace!(pivot = %x.id, "rotate left");
    x.right = z.left;
    z.left = Some(x.id);
    let shrunk = z.balance != 0;
    if shrunk {
        x.balance = 0;
        z.balance = 0;
    } else {
        x.balance = 1;
        z.balance = -1;
    }
    store.put_node(x)?;
    Ok(Rebalanced { root: z, shrunk })
}

/// Single right rotation around `x`, whose left child is `z`.
fn rotate_right<E, S>(store: &mut S, mut x: Node<E>, mut z: Node<E>) -> CoreResult<Rebalanced<E>>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
{
    trace!(pivot = %x.id, "rotate right");
    x.left = z.right;
    z.right = Some(x.id);
    let shrunk = z.balance != 0;
    if shrunk {
        x.balance = 0;
        z.balance = 0;
    } else {
        x.balance = -1;
        z.balance = 1;
    }
    store.put_node(x)?;
    Ok(Rebalanced { root: z, shrunk })
}

/// Right rotation around `z` followed by left rotation around `x`.
///
/// `z` is the right child of `x` and `y` is the left child of `z`.
fn rotate_right_left<E, S>(
    store: &mut S,
    mut x: Node<E>,
    mut z: Node<E>,
    mut y: Node<E>,
) -> CoreResult<Rebalanced<E>>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
{
    trace!(pivot = %x.id, "rotate right-left");
    x.right = y.left;
    z.left = y.right;
    y.left = Some(x.id);
    y.right = Some(z.id);
    (x.balance, z.balance) = match y.balance {
        1 => (-1, 0),
        -1 => (0, 1),
        _ => (0, 0),
    };
    y.balance = 0;
    store.put_node(x)?;
    store.put_node(z)?;
    Ok(Rebalanced {
        root: y,
        shrunk: true,
    })
}

/// Left rotation around `z` followed by right rotation around `x`.
///
/// `z` is the left child of `x` and `y` is the right child of `z`.
fn rotate_left_right<E, S>(
    store: &mut S,
    mut x: Node<E>,
    mut z: Node<E>,
    mut y: Node<E>,
) -> CoreResult<Rebalanced<E>>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
{
    trace!(pivot = %x.id, "rotate left-right");
    x.left = y.right;
    z.right = y.left;
    y.right = Some(x.id);
    y.left = Some(z.id);
    (x.balance, z.balance) = match y.balance {
        -1 => (1, 0),
        1 => (0, -1),
        _ => (0, 0),
    };
    y.balance = 0;
    store.put_node(x)?;
    store.put_node(z)?;
    Ok(Rebalanced {
        root: y,
        shrunk: true,
    })
}
