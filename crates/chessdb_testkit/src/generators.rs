//! Property-based test generators using proptest.
//!
//! Names are drawn from small alphabets so that generated players collide
//! on their keys often enough to exercise duplicate handling.

use crate::player::Player;
use chessdb_core::{CoreResult, Entity, EntityId, EntityIndex, IndexTransaction};
use proptest::prelude::*;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Strategy for last names, with frequent collisions.
pub fn last_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-E][a-c]{0,2}").expect("Invalid regex")
}

/// Strategy for first names, with frequent collisions.
pub fn first_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-b]{0,2}").expect("Invalid regex")
}

/// Strategy for unsaved players.
pub fn player_strategy() -> impl Strategy<Value = Player> {
    (last_name_strategy(), first_name_strategy(), 0u32..100)
        .prop_map(|(last, first, count)| Player::new(&last, &first).with_new_stats(count, None))
}

/// One mutation applied to a player index.
#[derive(Debug, Clone)]
pub enum IndexOp {
    /// Add a new player.
    Add(Player),
    /// Replace a live player, chosen by position among the live ids.
    Put {
        /// Selector into the live ids (taken modulo their number).
        slot: usize,
        /// Replacement record.
        player: Player,
    },
    /// Delete a live player, chosen by position among the live ids.
    Delete {
        /// Selector into the live ids (taken modulo their number).
        slot: usize,
    },
}

/// Strategy for a single index mutation.
pub fn index_op_strategy() -> impl Strategy<Value = IndexOp> {
    prop_oneof![
        4 => player_strategy().prop_map(IndexOp::Add),
        2 => (any::<usize>(), player_strategy())
            .prop_map(|(slot, player)| IndexOp::Put { slot, player }),
        2 => any::<usize>().prop_map(|slot| IndexOp::Delete { slot }),
    ]
}

/// Strategy for a sequence of index mutations.
pub fn index_op_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<IndexOp>> {
    prop::collection::vec(index_op_strategy(), min_ops..max_ops)
}

/// Reference model of a player index.
///
/// Tracks id allocation (a LIFO free list in front of a growing id space)
/// and the in-order sequence, where a new or re-keyed entity goes after
/// every entity it compares equal to.
#[derive(Debug, Clone, Default)]
pub struct PlayerModel {
    records: BTreeMap<EntityId, Player>,
    order: Vec<EntityId>,
    free: Vec<EntityId>,
    capacity: u32,
}

impl PlayerModel {
    /// Creates an empty model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live players.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no player is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of ids ever allocated.
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Returns the live player under `id`.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Player> {
        self.records.get(&id)
    }

    /// Live players in identity order.
    pub fn by_identity(&self) -> impl Iterator<Item = &Player> {
        self.records.values()
    }

    /// Live players in key order.
    #[must_use]
    pub fn in_order(&self) -> Vec<&Player> {
        self.order.iter().filter_map(|id| self.records.get(id)).collect()
    }

    /// Resolves a slot selector to a live id.
    #[must_use]
    pub fn pick(&self, slot: usize) -> Option<EntityId> {
        if self.records.is_empty() {
            return None;
        }
        self.records.keys().nth(slot % self.records.len()).copied()
    }

    /// Records an add and returns the id the index should assign.
    pub fn add(&mut self, player: Player) -> EntityId {
        let id = self.free.pop().unwrap_or_else(|| {
            self.capacity += 1;
            EntityId::new(self.capacity - 1)
        });
        let player = player.with_new_id(id);
        self.place(id, &player);
        self.records.insert(id, player);
        id
    }

    /// Records a replacement of a live player.
    pub fn put(&mut self, id: EntityId, player: Player) {
        let player = player.with_new_id(id);
        let Some(current) = self.records.get(&id) else {
            return;
        };
        if current.compare(&player) != Ordering::Equal {
            self.order.retain(|other| *other != id);
            self.place(id, &player);
        }
        self.records.insert(id, player);
    }

    /// Records a delete. Returns false if `id` was not live.
    pub fn delete(&mut self, id: EntityId) -> bool {
        if self.records.remove(&id).is_none() {
            return false;
        }
        self.order.retain(|other| *other != id);
        self.free.push(id);
        true
    }

    /// Applies `op` to both the model and a batch.
    pub fn apply(&mut self, txn: &mut IndexTransaction<'_, Player>, op: &IndexOp) -> CoreResult<()> {
        match op {
            IndexOp::Add(player) => {
                txn.add(player.clone())?;
                self.add(player.clone());
            }
            IndexOp::Put { slot, player } => {
                if let Some(id) = self.pick(*slot) {
                    txn.put(id, player.clone())?;
                    self.put(id, player.clone());
                }
            }
            IndexOp::Delete { slot } => {
                if let Some(id) = self.pick(*slot) {
                    txn.delete(id)?;
                    self.delete(id);
                }
            }
        }
        Ok(())
    }

    /// Compares `index` with the model, returning a description of the
    /// first difference.
    pub fn diff(&self, index: &EntityIndex<Player>) -> CoreResult<Option<String>> {
        let count = index.count()? as usize;
        if count != self.len() {
            return Ok(Some(format!("count {count}, model {}", self.len())));
        }
        let capacity = index.capacity()?;
        if capacity != self.capacity {
            return Ok(Some(format!("capacity {capacity}, model {}", self.capacity)));
        }
        let stored: Vec<Player> = index.iter()?.collect::<CoreResult<_>>()?;
        let expected: Vec<&Player> = self.by_identity().collect();
        if !same_players(&stored, &expected) {
            return Ok(Some(format!("identity order {stored:?}, model {expected:?}")));
        }
        let ordered: Vec<Player> = index.stream_ascending()?.collect::<CoreResult<_>>()?;
        let expected = self.in_order();
        if !same_players(&ordered, &expected) {
            return Ok(Some(format!("key order {ordered:?}, model {expected:?}")));
        }
        Ok(None)
    }

    fn place(&mut self, id: EntityId, player: &Player) {
        let at = self.order.partition_point(|other| {
            self.records
                .get(other)
                .is_some_and(|other| other.compare(player) != Ordering::Greater)
        });
        self.order.insert(at, id);
    }
}

fn same_players(stored: &[Player], expected: &[&Player]) -> bool {
    stored.len() == expected.len() && stored.iter().zip(expected).all(|(a, b)| a == *b)
}
