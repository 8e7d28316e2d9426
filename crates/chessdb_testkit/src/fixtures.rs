//! Test fixtures and index helpers.

use crate::player::Player;
use chessdb_core::{Config, Entity, EntityIndex};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// File name used for file-backed test indexes.
pub const TEST_FILE_NAME: &str = "players.chx";

/// A test index with automatic cleanup.
pub struct TestIndex<E: Entity = Player> {
    /// The index instance.
    pub index: EntityIndex<E>,
    /// The temporary directory (kept alive to prevent cleanup).
    dir: Option<TempDir>,
}

impl<E: Entity> TestIndex<E> {
    /// Creates an in-memory test index.
    pub fn memory() -> Self {
        Self::memory_with(Config::default())
    }

    /// Creates an in-memory test index with custom configuration.
    pub fn memory_with(config: Config) -> Self {
        Self {
            index: EntityIndex::in_memory(config),
            dir: None,
        }
    }

    /// Creates a file-backed test index in a fresh temporary directory.
    pub fn file() -> Self {
        Self::file_with(Config::default().sync_on_commit(false))
    }

    /// Creates a file-backed test index with custom configuration.
    pub fn file_with(config: Config) -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join(TEST_FILE_NAME);
        let index = EntityIndex::create(&path, config).expect("Failed to create index file");
        Self {
            index,
            dir: Some(dir),
        }
    }

    /// Returns the index file path if file-backed.
    pub fn path(&self) -> Option<PathBuf> {
        self.dir.as_ref().map(|d| d.path().join(TEST_FILE_NAME))
    }

    /// Returns the temporary directory if file-backed.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_ref().map(TempDir::path)
    }

    /// Closes the index and opens its file again.
    ///
    /// # Panics
    ///
    /// Panics for in-memory indexes.
    pub fn reopen(self) -> Self {
        let path = self.path().expect("Only file-backed indexes can be reopened");
        let config = self.index.config().clone();
        let Self { index, dir } = self;
        index.close().expect("Failed to close index");
        drop(index);
        let index = EntityIndex::open(&path, config).expect("Failed to reopen index");
        Self { index, dir }
    }
}

impl<E: Entity> std::ops::Deref for TestIndex<E> {
    type Target = EntityIndex<E>;

    fn deref(&self) -> &Self::Target {
        &self.index
    }
}

/// Runs a test with a temporary in-memory player index.
///
/// # Example
///
/// ```rust,ignore
/// use chessdb_testkit::{with_temp_index, Player};
///
/// #[test]
/// fn my_test() {
///     with_temp_index(|index| {
///         index.add(Player::new("Tal", "Mikhail")).unwrap();
///     });
/// }
/// ```
pub fn with_temp_index<F, R>(f: F) -> R
where
    F: FnOnce(&EntityIndex<Player>) -> R,
{
    let test_index = TestIndex::<Player>::memory();
    f(&test_index.index)
}

/// Runs a test with a temporary file-backed player index.
pub fn with_file_index<F, R>(f: F) -> R
where
    F: FnOnce(&EntityIndex<Player>, &Path) -> R,
{
    let test_index = TestIndex::<Player>::file();
    let path = test_index.path().expect("File index should have a path");
    f(&test_index.index, &path)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// The four players of the id-reuse scenario, in insertion order.
    pub fn elite_players() -> Vec<Player> {
        vec![
            Player::new("Carlsen", "Magnus"),
            Player::new("Caruana", "Fabiano"),
            Player::new("Aronian", "Levon"),
            Player::new("Ding", "Liren"),
        ]
    }

    /// Synthetic players with distinct names, in scrambled key order.
    pub fn numbered_players(count: usize) -> Vec<Player> {
        (0..count)
            .map(|i| {
                let n = (i * 7919) % count.max(1);
                Player::new(&format!("Player{n:06}"), &format!("No{i}"))
            })
            .collect()
    }

    /// Creates an in-memory index holding `count` numbered players.
    pub fn populated_index(count: usize) -> TestIndex<Player> {
        let test_index = TestIndex::memory();
        test_index
            .batch(|txn| {
                for player in numbered_players(count) {
                    txn.add(player)?;
                }
                Ok(())
            })
            .expect("Failed to populate index");
        test_index
    }
}
