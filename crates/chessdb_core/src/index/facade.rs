//! Entity index handle and lifecycle.

use crate::config::Config;
use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::index::batch::IndexTransaction;
use crate::index::cache::EntityCache;
use crate::index::iter::{IdentityIter, OrderedIter};
use crate::node::{copy_nodes, InMemoryNodeStore, NodeStore, PagedNodeStore};
use crate::tree::{self, TreePath};
use crate::types::{EntityId, Version};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Action run by [`EntityIndex::close`] before the store is released.
pub type CloseAction<E> = Box<dyn FnOnce(&EntityIndex<E>) -> CoreResult<()> + Send>;

/// Shared state guarded by the index lock.
pub(crate) struct IndexState<E: Entity> {
    pub(crate) store: Box<dyn NodeStore<E>>,
    pub(crate) version: Version,
    closed: bool,
}

impl<E: Entity> IndexState<E> {
    fn ensure_open(&self) -> CoreResult<()> {
        if self.closed {
            Err(CoreError::IndexClosed)
        } else {
            Ok(())
        }
    }

    /// Fails unless the index is open and still at `expected`.
    pub(crate) fn check_version(&self, expected: Version) -> CoreResult<()> {
        self.ensure_open()?;
        if self.version != expected {
            return Err(CoreError::ConcurrentModification {
                expected: expected.as_u64(),
                actual: self.version.as_u64(),
            });
        }
        Ok(())
    }
}

/// An ordered, persistent index of one entity kind.
///
/// `EntityIndex` provides:
/// - Lookup by identity, by unique key, by any equal key and by all equal keys
/// - Atomic mutation batches (single operations are one-operation batches)
/// - Identity-order and key-order iteration, both fail-fast
/// - Structural validation
///
/// # Opening an Index
///
/// ```rust,ignore
/// use chessdb_core::{Config, EntityIndex};
///
/// let players: EntityIndex<Player> = EntityIndex::open(path, Config::default())?;
/// let carlsen = players.add(Player::new("Carlsen", "Magnus"))?;
/// assert_eq!(players.get(carlsen.id().unwrap())?, Some(carlsen));
/// players.close()?;
/// ```
///
/// # Concurrency
///
/// One read-write lock guards the node store. Reads take it per call (or
/// per iterator step); a batch holds it for its whole lifetime. Every
/// committed batch bumps the structural version, which live iterators
/// detect on their next step.
pub struct EntityIndex<E: Entity> {
    config: Config,
    /// Backing file. `None` for in-memory indexes.
    path: Option<PathBuf>,
    pub(crate) state: RwLock<IndexState<E>>,
    cache: Mutex<EntityCache<E>>,
    close_actions: Mutex<Vec<CloseAction<E>>>,
}

impl<E: Entity> EntityIndex<E> {
    fn from_store(store: Box<dyn NodeStore<E>>, config: Config, path: Option<PathBuf>) -> Self {
        Self {
            cache: Mutex::new(EntityCache::new(config.cache_capacity)),
            config,
            path,
            state: RwLock::new(IndexState {
                store,
                version: Version::default(),
                closed: false,
            }),
            close_actions: Mutex::new(Vec::new()),
        }
    }

    /// Creates a new index file at `path`.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidOperation` if a non-empty file already exists.
    pub fn create(path: &Path, config: Config) -> CoreResult<Self> {
        let store = Self::open_store(path, &config, true, true)?;
        Ok(Self::from_store(store, config, Some(path.to_path_buf())))
    }

    /// Opens the index file at `path`, creating it when missing unless
    /// `create_if_missing` is off.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file is missing and `create_if_missing` is false
    /// - The file exists and `error_if_exists` is true
    /// - The header is corrupt or was written for another entity kind
    pub fn open(path: &Path, config: Config) -> CoreResult<Self> {
        let store = Self::open_store(
            path,
            &config,
            config.create_if_missing,
            config.error_if_exists,
        )?;
        Ok(Self::from_store(store, config, Some(path.to_path_buf())))
    }

    /// Opens or creates the paged store at `path`.
    ///
    /// Only the existence flags given here are checked; those in `config`
    /// are ignored.
    fn open_store(
        path: &Path,
        config: &Config,
        create_if_missing: bool,
        error_if_exists: bool,
    ) -> CoreResult<Box<dyn NodeStore<E>>> {
        let store = if file_has_data(path)? {
            if error_if_exists {
                return Err(CoreError::invalid_operation(format!(
                    "index file {} already exists",
                    path.display()
                )));
            }
            PagedNodeStore::<E>::open_file(path, config.sync_on_commit)?
        } else {
            if !create_if_missing {
                return Err(CoreError::invalid_operation(format!(
                    "index file {} does not exist",
                    path.display()
                )));
            }
            PagedNodeStore::<E>::create_file(path, config.sync_on_commit)?
        };
        info!(
            path = %path.display(),
            count = store.metadata().live_count,
            "opened entity index"
        );
        Ok(Box::new(store))
    }

    /// Loads the index file at `path` fully into memory.
    ///
    /// The file is read in batches of `scan_batch_size` nodes and then
    /// released; later changes live only in memory unless
    /// [`persist_on_close`](Self::persist_on_close) or
    /// [`duplicate_to`](Self::duplicate_to) writes them out.
    pub fn open_into_memory(path: &Path, config: Config) -> CoreResult<Self> {
        if !file_has_data(path)? {
            return Err(CoreError::invalid_operation(format!(
                "index file {} does not exist",
                path.display()
            )));
        }
        let mut file = PagedNodeStore::<E>::open_file(path, false)?;
        let mut memory = InMemoryNodeStore::new();
        copy_nodes(&file, &mut memory, config.scan_batch_size)?;
        file.close()?;
        info!(
            path = %path.display(),
            count = memory.metadata().live_count,
            "loaded entity index into memory"
        );
        Ok(Self::from_store(Box::new(memory), config, None))
    }

    /// Creates an empty index held only in memory.
    #[must_use]
    pub fn in_memory(config: Config) -> Self {
        Self::from_store(Box::new(InMemoryNodeStore::new()), config, None)
    }

    /// Writes a copy of the index to a new file at `path`.
    ///
    /// Fails if `path` already holds data.
    pub fn duplicate_to(&self, path: &Path) -> CoreResult<()> {
        let state = self.state.read();
        state.ensure_open()?;
        if file_has_data(path)? {
            return Err(CoreError::invalid_operation(format!(
                "cannot duplicate into existing file {}",
                path.display()
            )));
        }
        let mut target = PagedNodeStore::<E>::create_file(path, self.config.sync_on_commit)?;
        copy_nodes(&*state.store, &mut target, self.config.scan_batch_size)?;
        target.close()?;
        info!(
            path = %path.display(),
            count = state.store.metadata().live_count,
            "duplicated entity index"
        );
        Ok(())
    }

    /// Registers writing the index to `path` when it is closed.
    ///
    /// An existing file at `path` is replaced atomically: the copy is
    /// written next to it and renamed over it.
    pub fn persist_on_close(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.on_close(move |index: &Self| {
            let mut staging = path.clone().into_os_string();
            staging.push(".tmp");
            let staging = PathBuf::from(staging);
            if staging.exists() {
                std::fs::remove_file(&staging)?;
            }
            index.duplicate_to(&staging)?;
            std::fs::rename(&staging, &path)?;
            Ok(())
        });
    }

    /// Registers an action to run when the index is closed.
    ///
    /// Actions run in registration order, before the store is released.
    pub fn on_close<F>(&self, action: F)
    where
        F: FnOnce(&Self) -> CoreResult<()> + Send + 'static,
    {
        self.close_actions.lock().push(Box::new(action));
    }

    /// Closes the index.
    ///
    /// Runs the registered close actions, then flushes and releases the
    /// store. Every action runs even if an earlier one fails; the first
    /// failure is returned. Closing twice is a no-op.
    pub fn close(&self) -> CoreResult<()> {
        if self.state.read().closed {
            return Ok(());
        }

        let actions = std::mem::take(&mut *self.close_actions.lock());
        let mut first_error = None;
        for action in actions {
            if let Err(err) = action(self) {
                warn!(error = %err, "close action failed");
                first_error.get_or_insert(err);
            }
        }

        let mut state = self.state.write();
        if state.closed {
            return first_error.map_or(Ok(()), Err);
        }
        let released = state.store.close();
        state.closed = true;
        state.version = state.version.next();
        drop(state);
        self.cache.lock().clear();
        info!(path = ?self.path, "closed entity index");

        if let Err(err) = released {
            first_error.get_or_insert(err);
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Returns true until [`close`](Self::close) has run.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.state.read().closed
    }

    /// Returns the index configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the backing file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the current structural version.
    #[must_use]
    pub fn version(&self) -> Version {
        self.state.read().version
    }

    fn read<R>(&self, f: impl FnOnce(&dyn NodeStore<E>) -> CoreResult<R>) -> CoreResult<R> {
        let state = self.state.read();
        state.ensure_open()?;
        f(&*state.store)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Number of live entities.
    pub fn count(&self) -> CoreResult<u32> {
        self.read(|store| Ok(store.metadata().live_count))
    }

    /// Number of allocated ids, tombstones included.
    pub fn capacity(&self) -> CoreResult<u32> {
        self.read(|store| Ok(store.metadata().capacity))
    }

    /// Reads the entity with identity `id`.
    ///
    /// Returns `None` for ids that were never allocated or are deleted.
    pub fn get(&self, id: EntityId) -> CoreResult<Option<E>> {
        self.read(|store| {
            if let Some(hit) = self.cache.lock().get(id) {
                return Ok(Some(hit));
            }
            if id.as_u32() >= store.metadata().capacity {
                return Ok(None);
            }
            let node = store.get_node(id)?;
            let record = if node.is_live() { node.record } else { None };
            if let Some(record) = &record {
                self.cache.lock().insert(id, record.clone());
            }
            Ok(record)
        })
    }

    /// Finds the single entity equal to `key`.
    ///
    /// # Errors
    ///
    /// Fails with `DuplicateKey` if more than one entity matches.
    pub fn get_by_key(&self, key: &E) -> CoreResult<Option<E>> {
        self.read(|store| tree::find_unique(store, key))
    }

    /// Finds some entity equal to `key`, without checking for duplicates.
    pub fn get_any(&self, key: &E) -> CoreResult<Option<E>> {
        self.read(|store| tree::find_any(store, key))
    }

    /// Finds every entity equal to `key`, in insertion order.
    pub fn get_all(&self, key: &E) -> CoreResult<Vec<E>> {
        self.read(|store| tree::find_all(store, key))
    }

    /// The smallest entity.
    pub fn first(&self) -> CoreResult<Option<E>> {
        self.read(|store| record_at(&tree::first(store)?))
    }

    /// The largest entity.
    pub fn last(&self) -> CoreResult<Option<E>> {
        self.read(|store| record_at(&tree::last(store)?))
    }

    /// The first entity strictly greater than `key`.
    pub fn next_of(&self, key: &E) -> CoreResult<Option<E>> {
        self.read(|store| record_at(&tree::upper_bound(store, key)?))
    }

    /// The last entity strictly less than `key`.
    pub fn previous_of(&self, key: &E) -> CoreResult<Option<E>> {
        self.read(|store| record_at(&tree::strict_floor(store, key)?))
    }

    /// Checks every structural invariant of the tree.
    pub fn validate_structure(&self) -> CoreResult<()> {
        self.read(|store| tree::validate(store))
    }

    // ========================================================================
    // Iteration
    // ========================================================================

    /// Iterates all live entities in identity order.
    pub fn iter(&self) -> CoreResult<IdentityIter<'_, E>> {
        self.iter_from(EntityId::new(0))
    }

    /// Iterates live entities with id `>= start`, in identity order.
    pub fn iter_from(&self, start: EntityId) -> CoreResult<IdentityIter<'_, E>> {
        let state = self.state.read();
        state.ensure_open()?;
        Ok(IdentityIter::new(self, state.version, start))
    }

    /// Iterates all entities in ascending key order.
    pub fn stream_ascending(&self) -> CoreResult<OrderedIter<'_, E>> {
        self.ordered(true, |store| tree::first(store))
    }

    /// Iterates entities `>= key` in ascending key order.
    pub fn stream_ascending_from(&self, key: &E) -> CoreResult<OrderedIter<'_, E>> {
        self.ordered(true, |store| tree::lower_bound(store, key))
    }

    /// Iterates all entities in descending key order.
    pub fn stream_descending(&self) -> CoreResult<OrderedIter<'_, E>> {
        self.ordered(false, |store| tree::last(store))
    }

    /// Iterates entities `<= key` in descending key order.
    pub fn stream_descending_from(&self, key: &E) -> CoreResult<OrderedIter<'_, E>> {
        self.ordered(false, |store| tree::floor(store, key))
    }

    fn ordered(
        &self,
        ascending: bool,
        start: impl FnOnce(&dyn NodeStore<E>) -> CoreResult<TreePath<E>>,
    ) -> CoreResult<OrderedIter<'_, E>> {
        let state = self.state.read();
        state.ensure_open()?;
        let path = start(&*state.store)?;
        Ok(if ascending {
            OrderedIter::ascending(self, state.version, path)
        } else {
            OrderedIter::descending(self, state.version, path)
        })
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Runs `f` as one atomic batch.
    ///
    /// If `f` returns `Ok`, every staged change is committed and the version
    /// moves on. If it returns `Err`, nothing is written.
    pub fn batch<F, T>(&self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&mut IndexTransaction<'_, E>) -> CoreResult<T>,
    {
        let mut state = self.state.write();
        state.ensure_open()?;

        let (result, finished) = {
            let mut txn = IndexTransaction::new(&*state.store);
            let result = f(&mut txn)?;
            (result, txn.finish())
        };
        if !finished.alters(state.store.metadata()) {
            return Ok(result);
        }

        let applied = finished.changes.apply(&mut *state.store);
        // A partial write still invalidates every reader.
        state.version = state.version.next();
        let mut cache = self.cache.lock();
        for id in &finished.touched {
            cache.remove(*id);
        }
        drop(cache);
        let written = applied?;
        debug!(nodes = written, version = %state.version, "committed batch");
        Ok(result)
    }

    /// Adds an entity, returning it with its assigned identity.
    pub fn add(&self, entity: E) -> CoreResult<E> {
        let stored = self.batch(|txn| txn.add(entity))?;
        if let Some(id) = stored.id() {
            self.cache.lock().insert(id, stored.clone());
        }
        Ok(stored)
    }

    /// Replaces the entity stored under `id`.
    ///
    /// # Errors
    ///
    /// Fails with `EntityNotFound` if `id` holds no live entity.
    pub fn put(&self, id: EntityId, entity: E) -> CoreResult<E> {
        self.batch(|txn| txn.put(id, entity))
    }

    /// Deletes the entity stored under `id`. Returns false if there was none.
    pub fn delete(&self, id: EntityId) -> CoreResult<bool> {
        self.batch(|txn| txn.delete(id))
    }

    /// Deletes `entity`, by identity if it carries one, else by key.
    pub fn delete_entity(&self, entity: &E) -> CoreResult<bool> {
        self.batch(|txn| txn.delete_entity(entity))
    }

    /// Drops every cached record.
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    /// Number of cached records.
    #[must_use]
    pub fn cached_count(&self) -> usize {
        self.cache.lock().len()
    }
}

impl<E: Entity> fmt::Debug for EntityIndex<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("EntityIndex")
            .field("path", &self.path)
            .field("version", &state.version)
            .field("closed", &state.closed)
            .finish_non_exhaustive()
    }
}

impl<E: Entity> Drop for EntityIndex<E> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

fn record_at<E: Entity>(path: &TreePath<E>) -> CoreResult<Option<E>> {
    path.node().map(|node| node.record().cloned()).transpose()
}

fn file_has_data(path: &Path) -> CoreResult<bool> {
    match std::fs::metadata(path) {
        Ok(meta) => Ok(meta.len() > 0),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}
