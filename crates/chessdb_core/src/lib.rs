//! # ChessDB Core
//!
//! Entity storage engine for the ChessDB archive format.
//!
//! Every entity kind of an archive (players, tournaments, annotators,
//! sources, teams, game tags) lives in its own [`EntityIndex`]: a persistent
//! AVL tree of fixed-size records addressed by dense [`EntityId`]s.
//!
//! This crate provides:
//! - Node stores: in memory, or fixed-size slots in a file
//! - A copy-on-write transaction overlay for atomic batches
//! - The AVL tree engine (search, bounds, insert, delete, validation)
//! - The [`EntityIndex`] facade with fail-fast iterators
//!
//! ## Layering
//!
//! ```text
//! EntityIndex ── batch ──> TransactionOverlay ──┐
//!      │                                        ├──> tree engine
//!      └──────── reads ─────────────────────────┘        │
//!                                                        v
//!                                   NodeStore (memory | paged file)
//!                                                        │
//!                                                        v
//!                                     chessdb_storage::StorageBackend
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use chessdb_core::{Config, EntityIndex};
//!
//! let players = EntityIndex::<Player>::in_memory(Config::default());
//! let carlsen = players.add(Player::new("Carlsen", "Magnus"))?;
//! for player in players.stream_ascending()? {
//!     println!("{}", player?.last_name);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod entity;
mod error;
mod types;

pub mod index;
pub mod node;
pub mod transaction;
pub mod tree;

#[cfg(test)]
mod test_support;

pub use config::{Config, DEFAULT_SCAN_BATCH_SIZE};
pub use entity::Entity;
pub use error::{CoreError, CoreResult, Violation};
pub use index::{EntityIndex, IdentityIter, IndexTransaction, OrderedIter};
pub use types::{EntityId, Version};

/// Crate version, as recorded by tooling.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
