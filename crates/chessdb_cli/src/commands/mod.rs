//! CLI command implementations.

pub mod inspect;
pub mod verify;

/// Slots read per request when scanning a node file.
pub(crate) const SCAN_BATCH: u32 = 1000;
