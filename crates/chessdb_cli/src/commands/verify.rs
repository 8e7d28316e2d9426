//! Verify command implementation.
//!
//! Checks the structure of a node file without decoding records, so key
//! order is out of reach here; everything else the tree relies on is
//! covered.

use super::SCAN_BATCH;
use chessdb_core::node::{FileHeader, RawNodeFile, RawSlot};
use chessdb_core::EntityId;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Returned when verification finds problems.
#[derive(Debug, Error)]
#[error("verification failed with {0} error(s)")]
pub struct VerifyFailed(pub usize);

/// Verification result.
#[derive(Debug, Default)]
pub struct VerifyResult {
    /// Number of slots checked.
    pub slots_checked: usize,
    /// Live nodes reachable from the root.
    pub reachable: u32,
    /// Tombstones on the free list.
    pub free_slots: u32,
    /// Height of the tree.
    pub height: u32,
    /// List of errors found.
    pub errors: Vec<String>,
}

impl VerifyResult {
    fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs the verify command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying index at {:?}", path);
    println!();

    let file = match RawNodeFile::open(path) {
        Ok(file) => {
            println!("  Header checksum: ok");
            file
        }
        Err(err) => {
            println!("  ERROR: header: {}", err);
            println!();
            println!("✗ Index verification failed");
            return Err(Box::new(VerifyFailed(1)));
        }
    };

    let slots = read_all(&file)?;
    let result = verify(&file.header(), &slots);
    info!(
        path = %path.display(),
        slots = result.slots_checked,
        errors = result.errors.len(),
        "verified index"
    );
    print_result(&result);

    println!();
    if result.is_ok() {
        println!("✓ Index verification passed");
        Ok(())
    } else {
        println!("✗ Index verification failed");
        Err(Box::new(VerifyFailed(result.errors.len())))
    }
}

fn read_all(file: &RawNodeFile) -> Result<Vec<RawSlot>, Box<dyn std::error::Error>> {
    let capacity = file.header().metadata.capacity;
    let mut slots = Vec::with_capacity(capacity as usize);
    let mut start = 0;
    while start < capacity {
        let end = start.saturating_add(SCAN_BATCH).min(capacity);
        slots.extend(file.slots(start..end)?);
        start = end;
    }
    Ok(slots)
}

/// Checks the free list, the counts and the tree shape of `slots`.
///
/// `slots` must hold every slot of the file in id order.
pub fn verify(header: &FileHeader, slots: &[RawSlot]) -> VerifyResult {
    let meta = header.metadata;
    let mut result = VerifyResult {
        slots_checked: slots.len(),
        ..VerifyResult::default()
    };

    if slots.len() != meta.capacity as usize {
        result.errors.push(format!(
            "header capacity is {} but {} slots were read",
            meta.capacity,
            slots.len()
        ));
        return result;
    }

    let live = slots.iter().filter(|s| !s.tombstoned).count() as u32;
    let tombstones = slots.len() as u32 - live;
    if live != meta.live_count {
        result.errors.push(format!(
            "header live count is {} but {} live slots exist",
            meta.live_count, live
        ));
    }

    check_free_list(&mut result, meta.free_list_head, slots);
    if result.free_slots != tombstones {
        result.errors.push(format!(
            "free list holds {} slots but {} tombstones exist",
            result.free_slots, tombstones
        ));
    }

    let mut walk = TreeWalk {
        slots,
        visited: HashSet::new(),
        errors: Vec::new(),
    };
    let height = walk.height(meta.root, None);
    result.height = height;
    result.reachable = walk.visited.len() as u32;
    result.errors.append(&mut walk.errors);
    if result.reachable != live {
        result.errors.push(format!(
            "{} live slots but {} reachable from the root",
            live, result.reachable
        ));
    }

    debug!(
        live,
        tombstones,
        height = result.height,
        "checked node slots"
    );
    result
}

fn check_free_list(result: &mut VerifyResult, head: Option<EntityId>, slots: &[RawSlot]) {
    let mut seen = HashSet::new();
    let mut next = head;
    while let Some(id) = next {
        let Some(slot) = slots.get(id.index()) else {
            result
                .errors
                .push(format!("free list points past capacity at {}", id));
            return;
        };
        if !slot.tombstoned {
            result
                .errors
                .push(format!("free list reaches live slot {}", id));
            return;
        }
        if !seen.insert(id) {
            result.errors.push(format!("free list loops at {}", id));
            return;
        }
        result.free_slots += 1;
        next = slot.left;
    }
}

struct TreeWalk<'a> {
    slots: &'a [RawSlot],
    visited: HashSet<EntityId>,
    errors: Vec<String>,
}

impl TreeWalk<'_> {
    /// Returns the height of the subtree at `id`, recording any violations.
    fn height(&mut self, id: Option<EntityId>, parent: Option<EntityId>) -> u32 {
        let Some(id) = id else {
            return 0;
        };
        let slots = self.slots;
        let Some(slot) = slots.get(id.index()) else {
            self.errors.push(match parent {
                Some(parent) => format!("slot {} links to missing slot {}", parent, id),
                None => format!("root {} is past capacity", id),
            });
            return 0;
        };
        if slot.tombstoned {
            self.errors.push(format!("tombstone {} is reachable", id));
            return 0;
        }
        if !self.visited.insert(id) {
            self.errors.push(format!("slot {} is reachable twice", id));
            return 0;
        }

        let left = self.height(slot.left, Some(id));
        let right = self.height(slot.right, Some(id));
        let actual = i64::from(right) - i64::from(left);
        if i64::from(slot.balance) != actual {
            self.errors.push(format!(
                "slot {} stores balance {} but subtrees differ by {}",
                id, slot.balance, actual
            ));
        } else if slot.balance.unsigned_abs() > 1 {
            self.errors
                .push(format!("slot {} is unbalanced ({})", id, slot.balance));
        }
        left.max(right) + 1
    }
}

fn print_result(result: &VerifyResult) {
    println!(
        "  Slots checked: {}, reachable: {}, free: {}, height: {}",
        result.slots_checked, result.reachable, result.free_slots, result.height
    );
    for error in &result.errors {
        println!("    ERROR: {}", error);
    }
}
