//! Persistent root-to-node paths.

use crate::node::Node;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

struct Frame<E> {
    direction: Ordering,
    node: Node<E>,
    parent: Option<Arc<Frame<E>>>,
}

/// An immutable stack of `(direction, node)` frames from the root down.
///
/// Every frame except the last records the step taken from its node:
/// `Less` for the left child, `Greater` for the right child. The last frame
/// holds the comparison of the searched key against its node, so `Equal`
/// there means the search hit.
///
/// Paths share their prefixes: pushing or popping never copies the frames
/// below.
pub struct TreePath<E> {
    top: Option<Arc<Frame<E>>>,
    depth: usize,
}

impl<E> Clone for TreePath<E> {
    fn clone(&self) -> Self {
        Self {
            top: self.top.clone(),
            depth: self.depth,
        }
    }
}

impl<E> Default for TreePath<E> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<E> TreePath<E> {
    /// The path that reaches no node.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            top: None,
            depth: 0,
        }
    }

    /// Returns a new path with one more frame.
    #[must_use]
    pub fn push(&self, direction: Ordering, node: Node<E>) -> Self {
        Self {
            top: Some(Arc::new(Frame {
                direction,
                node,
                parent: self.top.clone(),
            })),
            depth: self.depth + 1,
        }
    }

    /// Returns the path without its last frame.
    #[must_use]
    pub fn parent(&self) -> Self {
        match &self.top {
            Some(frame) => Self {
                top: frame.parent.clone(),
                depth: self.depth - 1,
            },
            None => Self::empty(),
        }
    }

    /// Returns true if the path reaches no node.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.top.is_none()
    }

    /// Number of frames.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The node the path ends at.
    #[must_use]
    pub fn node(&self) -> Option<&Node<E>> {
        self.top.as_ref().map(|frame| &frame.node)
    }

    /// Direction stored in the last frame.
    #[must_use]
    pub fn direction(&self) -> Option<Ordering> {
        self.top.as_ref().map(|frame| frame.direction)
    }

    /// Returns true if the last frame records an exact match.
    #[must_use]
    pub fn is_hit(&self) -> bool {
        self.direction() == Some(Ordering::Equal)
    }
}

impl<E: Clone> TreePath<E> {
    /// Returns the same path with the last frame's direction replaced.
    #[must_use]
    pub fn turn(&self, direction: Ordering) -> Self {
        match &self.top {
            Some(frame) => self.parent().push(direction, frame.node.clone()),
            None => Self::empty(),
        }
    }

    /// Copies the frames out, root first.
    #[must_use]
    pub fn frames(&self) -> Vec<(Ordering, Node<E>)> {
        let mut frames = Vec::with_capacity(self.depth);
        let mut cursor = self.top.as_deref();
        while let Some(frame) = cursor {
            frames.push((frame.direction, frame.node.clone()));
            cursor = frame.parent.as_deref();
        }
        frames.reverse();
        frames
    }
}

impl<E> fmt::Debug for TreePath<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut steps = Vec::with_capacity(self.depth);
        let mut cursor = self.top.as_deref();
        while let Some(frame) = cursor {
            steps.push((frame.node.id, frame.direction));
            cursor = frame.parent.as_deref();
        }
        steps.reverse();
        f.debug_list().entries(steps).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Name;
    use crate::types::EntityId;

    fn node(id: u32) -> Node<Name> {
        Node::new(EntityId::new(id), Name::new("x"))
    }

    #[test]
    fn push_and_pop_share_prefix() {
        let root = TreePath::empty().push(Ordering::Less, node(0));
        let left = root.push(Ordering::Equal, node(1));
        let right = root.push(Ordering::Greater, node(2));

        assert_eq!(left.depth(), 2);
        assert_eq!(right.node().unwrap().id, EntityId::new(2));
        assert_eq!(left.parent().node().unwrap().id, EntityId::new(0));
        assert!(left.is_hit());
        assert!(!right.is_hit());
        assert!(root.parent().is_empty());
        assert!(TreePath::<Name>::empty().parent().is_empty());
    }

    #[test]
    fn turn_replaces_last_direction_only() {
        let path = TreePath::empty()
            .push(Ordering::Greater, node(0))
            .push(Ordering::Equal, node(5));
        let turned = path.turn(Ordering::Less);

        assert_eq!(turned.direction(), Some(Ordering::Less));
        assert_eq!(path.direction(), Some(Ordering::Equal));
        assert_eq!(turned.parent().direction(), Some(Ordering::Greater));
    }

    #[test]
    fn frames_are_root_first() {
        let path = TreePath::empty()
            .push(Ordering::Greater, node(3))
            .push(Ordering::Less, node(7))
            .push(Ordering::Equal, node(1));
        let ids: Vec<u32> = path.frames().iter().map(|(_, n)| n.id.as_u32()).collect();
        assert_eq!(ids, vec![3, 7, 1]);
        assert_eq!(format!("{path:?}"), "[(EntityId(3), Greater), (EntityId(7), Less), (EntityId(1), Equal)]");
    }
}
