//! Inspect command implementation.

use super::SCAN_BATCH;
use chessdb_core::node::{RawNodeFile, RawSlot};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Index inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Index file path.
    pub path: String,
    /// File size in bytes.
    pub file_size: u64,
    /// Format version.
    pub format_version: u16,
    /// Serialized record length.
    pub record_len: u32,
    /// Size of one slot in bytes.
    pub slot_size: usize,
    /// Root node id.
    pub root: Option<u32>,
    /// Live count stored in the header.
    pub live_count: u32,
    /// Allocated slots.
    pub capacity: u32,
    /// Head of the free list.
    pub free_list_head: Option<u32>,
    /// Live slots found.
    pub live_slots: u32,
    /// Tombstoned slots found.
    pub tombstones: u32,
    /// Bytes past the last slot.
    pub trailing_bytes: u64,
    /// Per-slot listing (if requested).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slots: Option<Vec<SlotInfo>>,
}

/// Summary of a single slot.
#[derive(Debug, Serialize)]
pub struct SlotInfo {
    /// Slot id.
    pub id: u32,
    /// Whether the slot is a tombstone.
    pub tombstone: bool,
    /// Stored balance.
    pub balance: i8,
    /// Left child, or next free slot for tombstones.
    pub left: Option<u32>,
    /// Right child.
    pub right: Option<u32>,
}

impl From<&RawSlot> for SlotInfo {
    fn from(slot: &RawSlot) -> Self {
        Self {
            id: slot.id.as_u32(),
            tombstone: slot.tombstoned,
            balance: slot.balance,
            left: slot.left.map(|id| id.as_u32()),
            right: slot.right.map(|id| id.as_u32()),
        }
    }
}

/// Runs the inspect command.
pub fn run(path: &Path, show_slots: bool, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let file = RawNodeFile::open(path)?;
    let result = inspect(&file, path, show_slots)?;
    info!(path = %path.display(), capacity = result.capacity, "inspected index");

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_text_output(&result);
    }
    Ok(())
}

/// Collects header and slot statistics.
pub fn inspect(
    file: &RawNodeFile,
    path: &Path,
    collect_slots: bool,
) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let header = file.header();
    let meta = header.metadata;
    let file_size = file.size()?;
    let used = header.slot_offset(chessdb_core::EntityId::new(meta.capacity));

    let mut result = InspectResult {
        path: path.display().to_string(),
        file_size,
        format_version: header.version,
        record_len: header.record_len,
        slot_size: header.slot_size(),
        root: meta.root.map(|id| id.as_u32()),
        live_count: meta.live_count,
        capacity: meta.capacity,
        free_list_head: meta.free_list_head.map(|id| id.as_u32()),
        live_slots: 0,
        tombstones: 0,
        trailing_bytes: file_size.saturating_sub(used),
        slots: collect_slots.then(Vec::new),
    };

    let mut start = 0;
    while start < meta.capacity {
        let end = start.saturating_add(SCAN_BATCH).min(meta.capacity);
        for slot in file.slots(start..end)? {
            if slot.tombstoned {
                result.tombstones += 1;
            } else {
                result.live_slots += 1;
            }
            if let Some(slots) = result.slots.as_mut() {
                slots.push(SlotInfo::from(&slot));
            }
        }
        start = end;
    }

    Ok(result)
}

fn print_text_output(result: &InspectResult) {
    println!("ChessDB Index Inspection");
    println!("========================");
    println!();
    println!("Path: {}", result.path);
    println!();
    println!("Format:");
    println!("  Version:       {}", result.format_version);
    println!("  Record length: {} bytes", result.record_len);
    println!("  Slot size:     {} bytes", result.slot_size);
    println!("  File size:     {}", format_size(result.file_size));
    if result.trailing_bytes > 0 {
        println!("  Trailing:      {} bytes", result.trailing_bytes);
    }
    println!();
    println!("Tree:");
    println!("  Root:          {}", format_link(result.root));
    println!("  Live count:    {}", result.live_count);
    println!("  Capacity:      {}", result.capacity);
    println!("  Free list:     {}", format_link(result.free_list_head));
    println!();
    println!("Slots:");
    println!("  Live:          {}", result.live_slots);
    println!("  Tombstones:    {}", result.tombstones);

    if let Some(slots) = &result.slots {
        println!();
        for slot in slots {
            if slot.tombstone {
                println!("  [{}] tombstone, next free {}", slot.id, format_link(slot.left));
            } else {
                println!(
                    "  [{}] balance {:+}, left {}, right {}",
                    slot.id,
                    slot.balance,
                    format_link(slot.left),
                    format_link(slot.right)
                );
            }
        }
    }
}

fn format_link(link: Option<u32>) -> String {
    link.map_or_else(|| "-".to_string(), |id| id.to_string())
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} bytes", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chessdb_core::{Config, EntityIndex};
    use chessdb_testkit::{scenarios, Player, TestIndex};

    #[test]
    fn counts_live_slots_and_tombstones() {
        let index = TestIndex::<Player>::file_with(Config::default());
        for player in scenarios::elite_players() {
            index.add(player).unwrap();
        }
        index.delete(chessdb_core::EntityId::new(2)).unwrap();
        let path = index.path().unwrap();
        index.close().unwrap();

        let file = RawNodeFile::open(&path).unwrap();
        let result = inspect(&file, &path, true).unwrap();
        assert_eq!(result.capacity, 4);
        assert_eq!(result.live_count, 3);
        assert_eq!(result.live_slots, 3);
        assert_eq!(result.tombstones, 1);
        assert_eq!(result.free_list_head, Some(2));
        assert_eq!(result.record_len as usize, 58);
        assert_eq!(result.trailing_bytes, 0);
        assert_eq!(result.slots.as_ref().map(Vec::len), Some(4));

        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"free_list_head\":2"));
    }

    #[test]
    fn empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.chx");
        EntityIndex::<Player>::create(&path, Config::default())
            .unwrap()
            .close()
            .unwrap();

        let file = RawNodeFile::open(&path).unwrap();
        let result = inspect(&file, &path, false).unwrap();
        assert_eq!(result.capacity, 0);
        assert_eq!(result.root, None);
        assert!(result.slots.is_none());
    }

    #[test]
    fn format_helpers() {
        assert_eq!(format_link(None), "-");
        assert_eq!(format_link(Some(7)), "7");
        assert_eq!(format_size(100), "100 bytes");
        assert_eq!(format_size(2048), "2.0 KB");
    }
}
