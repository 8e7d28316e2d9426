//! # ChessDB Testkit
//!
//! Test utilities for ChessDB.
//!
//! This crate provides:
//! - A [`Player`] entity to index in tests
//! - Test fixtures and index helpers
//! - Property-based generators and a reference model using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chessdb_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_index() {
//!     with_temp_index(|index| {
//!         index.add(Player::new("Lasker", "Emanuel")).unwrap();
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod player;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::player::*;
}

pub use fixtures::*;
pub use generators::*;
pub use player::*;
