//! # ChessDB Storage
//!
//! Byte-store backends for ChessDB index files.
//!
//! Backends are **opaque byte stores**: they do not know about node slots,
//! headers or entity records. `chessdb_core` owns every byte layout and only
//! asks a backend to read, overwrite, append and flush ranges of bytes.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`]: a `Vec<u8>` image, used by unit tests
//! - [`FileBackend`]: a `.chx` file on disk, addressed by absolute offset
//!
//! ## Example
//!
//! ```rust
//! use chessdb_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! backend.write_at(0, b"slot-0").unwrap();
//! backend.write_at(6, b"slot-1").unwrap();
//! assert_eq!(backend.read_at(6, 6).unwrap(), b"slot-1");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
