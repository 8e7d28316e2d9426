//! Structural validation.

use crate::entity::Entity;
use crate::error::{CoreError, CoreResult, Violation};
use crate::node::NodeStore;
use crate::types::EntityId;
use std::cmp::Ordering;

/// Checks every structural invariant of the tree.
///
/// - every reachable node is live and allocated
/// - every key lies within the bounds set by its ancestors (inclusive,
///   since equal keys may end up on either side after rotations)
/// - every stored balance equals the recomputed one and lies in `-1..=1`
/// - the number of reachable nodes equals the stored live count
///
/// The first violation found is returned, naming the offending node.
pub fn validate<E, S>(store: &S) -> CoreResult<()>
where
    E: Entity,
    S: NodeStore<E> + ?Sized,
{
    let meta = store.metadata();
    let walker = Walker {
        store,
        capacity: meta.capacity,
        _marker: std::marker::PhantomData,
    };
    let summary = walker.check(None, meta.root, None, None, 0)?;
    if summary.count != meta.live_count {
        return Err(CoreError::StructuralInconsistency {
            node: None,
            violation: Violation::CountMismatch {
                stored: meta.live_count,
                found: summary.count,
            },
        });
    }
    Ok(())
}

struct Walker<'a, E, S: ?Sized> {
    store: &'a S,
    capacity: u32,
    _marker: std::marker::PhantomData<E>,
}

#[derive(Clone, Copy)]
struct Summary {
    height: i32,
    count: u32,
}

impl<E: Entity, S: NodeStore<E> + ?Sized> Walker<'_, E, S> {
    fn check(
        &self,
        parent: Option<EntityId>,
        id: Option<EntityId>,
        low: Option<&E>,
        high: Option<&E>,
        depth: u32,
    ) -> CoreResult<Summary> {
        let Some(id) = id else {
            return Ok(Summary {
                height: 0,
                count: 0,
            });
        };
        let fail = |violation| CoreError::inconsistent(id, violation);
        if id.as_u32() >= self.capacity {
            return Err(CoreError::StructuralInconsistency {
                node: parent,
                violation: Violation::DanglingChild { child: id },
            });
        }
        if depth > self.capacity {
            return Err(fail(Violation::Cycle));
        }

        let node = self.store.get_node(id)?;
        if !node.is_live() {
            return Err(fail(Violation::TombstoneReachable));
        }
        let record = node.record()?;
        let below_low = low.is_some_and(|low| record.compare(low) == Ordering::Less);
        let above_high = high.is_some_and(|high| record.compare(high) == Ordering::Greater);
        if below_low || above_high {
            return Err(fail(Violation::OutOfOrder));
        }

        let left = self.check(Some(id), node.left, low, Some(record), depth + 1)?;
        let right = self.check(Some(id), node.right, Some(record), high, depth + 1)?;

        let actual = right.height - left.height;
        if actual != i32::from(node.balance) {
            return Err(fail(Violation::BalanceMismatch {
                stored: node.balance,
                actual,
            }));
        }
        if !(-1..=1).contains(&node.balance) {
            return Err(fail(Violation::Unbalanced {
                balance: node.balance,
            }));
        }

        Ok(Summary {
            height: 1 + left.height.max(right.height),
            count: 1 + left.count + right.count,
        })
    }
}
