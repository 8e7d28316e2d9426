//! Fixed-slot node store over a byte backend.
//!
//! ## File Layout
//!
//! ```text
//! | header (40) | slot 0 | slot 1 | ... | slot capacity-1 |
//!
//! header: magic "CHXN" (4) | version (2) | reserved (2) | record_len (4) |
//!         root (4) | live_count (4) | capacity (4) | free_list_head (4) |
//!         reserved (8) | crc32 (4)
//! slot:   flags (1) | balance (1) | left (4) | right (4) | record (record_len)
//! ```
//!
//! All integers are little-endian. Links use `-1` for "none". Flag bit 0
//! marks a tombstone, whose record bytes are zero-filled.

use crate::entity::{encode_record, Entity};
use crate::error::{CoreError, CoreResult};
use crate::node::{Node, NodeMetadata, NodeStore};
use crate::types::EntityId;
use bytes::{Buf, BufMut, BytesMut};
use chessdb_storage::{FileBackend, StorageBackend};
use std::marker::PhantomData;
use std::ops::Range;
use std::path::Path;
use tracing::{debug, warn};

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 40;

/// Bytes of structural data in each slot before the record.
pub const SLOT_OVERHEAD: usize = 10;

const MAGIC: &[u8; 4] = b"CHXN";
const FORMAT_VERSION: u16 = 1;
const FLAG_TOMBSTONE: u8 = 0x01;

/// Decoded file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Format version.
    pub version: u16,
    /// Serialized length of one entity record.
    pub record_len: u32,
    /// Tree metadata.
    pub metadata: NodeMetadata,
}

impl FileHeader {
    fn new(record_len: u32) -> Self {
        Self {
            version: FORMAT_VERSION,
            record_len,
            metadata: NodeMetadata::default(),
        }
    }

    /// Size of one node slot.
    #[must_use]
    pub fn slot_size(&self) -> usize {
        SLOT_OVERHEAD + self.record_len as usize
    }

    /// File offset of the slot for `id`.
    #[must_use]
    pub fn slot_offset(&self, id: EntityId) -> u64 {
        HEADER_SIZE as u64 + u64::from(id.as_u32()) * self.slot_size() as u64
    }

    /// Encodes the header, checksum included.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE);
        buf.put_slice(MAGIC);
        buf.put_u16_le(self.version);
        buf.put_u16_le(0);
        buf.put_u32_le(self.record_len);
        buf.put_i32_le(EntityId::to_link(self.metadata.root));
        buf.put_u32_le(self.metadata.live_count);
        buf.put_u32_le(self.metadata.capacity);
        buf.put_i32_le(EntityId::to_link(self.metadata.free_list_head));
        buf.put_bytes(0, 8);
        let crc = crc32fast::hash(&buf);
        buf.put_u32_le(crc);
        buf.to_vec()
    }

    /// Decodes and verifies a header.
    pub fn decode(data: &[u8]) -> CoreResult<Self> {
        if data.len() < HEADER_SIZE {
            return Err(CoreError::invalid_format("header too short"));
        }
        if &data[..4] != MAGIC {
            return Err(CoreError::invalid_format(format!(
                "bad magic: expected {:?}, got {:?}",
                MAGIC,
                &data[..4]
            )));
        }

        let mut crc_bytes = &data[HEADER_SIZE - 4..HEADER_SIZE];
        let stored_crc = crc_bytes.get_u32_le();
        let computed_crc = crc32fast::hash(&data[..HEADER_SIZE - 4]);
        if stored_crc != computed_crc {
            return Err(CoreError::ChecksumMismatch {
                expected: stored_crc,
                actual: computed_crc,
            });
        }

        let mut buf = &data[4..HEADER_SIZE - 4];
        let version = buf.get_u16_le();
        if version != FORMAT_VERSION {
            return Err(CoreError::invalid_format(format!(
                "unsupported format version {version}"
            )));
        }
        buf.advance(2);
        let record_len = buf.get_u32_le();
        let root = EntityId::from_link(buf.get_i32_le());
        let live_count = buf.get_u32_le();
        let capacity = buf.get_u32_le();
        let free_list_head = EntityId::from_link(buf.get_i32_le());

        Ok(Self {
            version,
            record_len,
            metadata: NodeMetadata {
                root,
                live_count,
                capacity,
                free_list_head,
            },
        })
    }
}

/// A node slot with its record left as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSlot {
    /// Slot id.
    pub id: EntityId,
    /// Tombstone flag.
    pub tombstoned: bool,
    /// Stored balance.
    pub balance: i8,
    /// Left link (free-list link for tombstones).
    pub left: Option<EntityId>,
    /// Right link.
    pub right: Option<EntityId>,
    /// Serialized record.
    pub record: Vec<u8>,
}

impl RawSlot {
    fn decode(id: EntityId, data: &[u8]) -> CoreResult<Self> {
        if data.len() < SLOT_OVERHEAD {
            return Err(CoreError::invalid_format(format!("slot {id} too short")));
        }
        let mut buf = data;
        let flags = buf.get_u8();
        let balance = buf.get_i8();
        let left = EntityId::from_link(buf.get_i32_le());
        let right = EntityId::from_link(buf.get_i32_le());
        Ok(Self {
            id,
            tombstoned: flags & FLAG_TOMBSTONE != 0,
            balance,
            left,
            right,
            record: buf.to_vec(),
        })
    }

    fn into_node<E: Entity>(self) -> CoreResult<Node<E>> {
        let record = if self.tombstoned {
            None
        } else {
            Some(E::deserialize(self.id, &self.record)?)
        };
        Ok(Node {
            id: self.id,
            record,
            left: self.left,
            right: self.right,
            balance: self.balance,
            tombstoned: self.tombstoned,
        })
    }
}

fn encode_slot<E: Entity>(node: &Node<E>, record_len: usize) -> CoreResult<Vec<u8>> {
    let mut buf = BytesMut::with_capacity(SLOT_OVERHEAD + record_len);
    let flags = if node.tombstoned { FLAG_TOMBSTONE } else { 0 };
    buf.put_u8(flags);
    buf.put_i8(node.balance);
    buf.put_i32_le(EntityId::to_link(node.left));
    buf.put_i32_le(EntityId::to_link(node.right));
    match &node.record {
        Some(record) if !node.tombstoned => buf.put_slice(&encode_record(record)?),
        _ => buf.put_bytes(0, record_len),
    }
    Ok(buf.to_vec())
}

fn read_header(backend: &dyn StorageBackend) -> CoreResult<FileHeader> {
    let size = backend.size()?;
    if size < HEADER_SIZE as u64 {
        return Err(CoreError::invalid_format(format!(
            "file holds {size} bytes, too small for a header"
        )));
    }
    let header = FileHeader::decode(&backend.read_at(0, HEADER_SIZE)?)?;

    let expected = header.slot_offset(EntityId::new(header.metadata.capacity));
    if size < expected {
        warn!(size, expected, "node file is shorter than its capacity");
        return Err(CoreError::invalid_format(format!(
            "file holds {size} bytes but capacity {} needs {expected}",
            header.metadata.capacity
        )));
    }
    Ok(header)
}

fn read_slots(
    backend: &dyn StorageBackend,
    header: &FileHeader,
    range: Range<u32>,
) -> CoreResult<Vec<RawSlot>> {
    let end = range.end.min(header.metadata.capacity);
    if range.start >= end {
        return Ok(Vec::new());
    }
    let slot_size = header.slot_size();
    let count = (end - range.start) as usize;
    let data = backend.read_at(header.slot_offset(EntityId::new(range.start)), count * slot_size)?;
    data.chunks_exact(slot_size)
        .zip(range.start..end)
        .map(|(chunk, id)| RawSlot::decode(EntityId::new(id), chunk))
        .collect()
}

/// Node store laid out as fixed-size slots after a header.
///
/// Works over any [`StorageBackend`]; [`PagedNodeStore::create_file`] and
/// [`PagedNodeStore::open_file`] wire it to a [`FileBackend`].
pub struct PagedNodeStore<E> {
    backend: Box<dyn StorageBackend>,
    header: FileHeader,
    sync_on_commit: bool,
    closed: bool,
    _marker: PhantomData<E>,
}

impl<E: Entity> PagedNodeStore<E> {
    /// Initializes an empty backend with a fresh header.
    pub fn create(mut backend: Box<dyn StorageBackend>, sync_on_commit: bool) -> CoreResult<Self> {
        if !backend.is_empty()? {
            return Err(CoreError::invalid_operation(
                "cannot create a node file over non-empty storage",
            ));
        }
        let header = FileHeader::new(E::SERIALIZED_LENGTH as u32);
        backend.append(&header.encode())?;
        backend.flush()?;
        Ok(Self {
            backend,
            header,
            sync_on_commit,
            closed: false,
            _marker: PhantomData,
        })
    }

    /// Opens a backend that already holds a node file.
    pub fn open(backend: Box<dyn StorageBackend>, sync_on_commit: bool) -> CoreResult<Self> {
        let header = read_header(backend.as_ref())?;
        if header.record_len as usize != E::SERIALIZED_LENGTH {
            return Err(CoreError::invalid_format(format!(
                "file stores {}-byte records, entity kind needs {}",
                header.record_len,
                E::SERIALIZED_LENGTH
            )));
        }
        debug!(
            capacity = header.metadata.capacity,
            live = header.metadata.live_count,
            "opened node file"
        );
        Ok(Self {
            backend,
            header,
            sync_on_commit,
            closed: false,
            _marker: PhantomData,
        })
    }

    /// Creates a new node file at `path`, creating parent directories.
    pub fn create_file(path: &Path, sync_on_commit: bool) -> CoreResult<Self> {
        let backend = FileBackend::open_with_create_dirs(path)?;
        Self::create(Box::new(backend), sync_on_commit)
    }

    /// Opens an existing node file at `path`.
    pub fn open_file(path: &Path, sync_on_commit: bool) -> CoreResult<Self> {
        let backend = FileBackend::open_existing(path)?;
        Self::open(Box::new(backend), sync_on_commit)
    }

    /// Returns the decoded header.
    #[must_use]
    pub fn header(&self) -> FileHeader {
        self.header
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if self.closed {
            Err(CoreError::IndexClosed)
        } else {
            Ok(())
        }
    }
}

impl<E: Entity> NodeStore<E> for PagedNodeStore<E> {
    fn get_node(&self, id: EntityId) -> CoreResult<Node<E>> {
        self.ensure_open()?;
        if id.as_u32() >= self.header.metadata.capacity {
            return Err(CoreError::NodeNotFound { id });
        }
        let data = self
            .backend
            .read_at(self.header.slot_offset(id), self.header.slot_size())?;
        RawSlot::decode(id, &data)?.into_node()
    }

    fn get_node_range(&self, range: Range<u32>) -> CoreResult<Vec<Node<E>>> {
        self.ensure_open()?;
        read_slots(self.backend.as_ref(), &self.header, range)?
            .into_iter()
            .map(RawSlot::into_node)
            .collect()
    }

    fn put_node(&mut self, node: Node<E>) -> CoreResult<()> {
        self.ensure_open()?;
        let slot = encode_slot(&node, self.header.record_len as usize)?;
        self.backend
            .write_at(self.header.slot_offset(node.id), &slot)?;
        Ok(())
    }

    fn metadata(&self) -> NodeMetadata {
        self.header.metadata
    }

    fn set_metadata(&mut self, metadata: NodeMetadata) -> CoreResult<()> {
        self.ensure_open()?;
        self.header.metadata = metadata;
        self.backend.write_at(0, &self.header.encode())?;
        if self.sync_on_commit {
            self.backend.sync()?;
        } else {
            self.backend.flush()?;
        }
        Ok(())
    }

    fn close(&mut self) -> CoreResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.backend.close()?;
        Ok(())
    }
}

impl<E> std::fmt::Debug for PagedNodeStore<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PagedNodeStore")
            .field("header", &self.header)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

/// Read-only, entity-agnostic view of a node file.
///
/// Decodes slots without deserializing records, for integrity tooling that
/// does not know which entity kind a file holds.
pub struct RawNodeFile {
    backend: Box<dyn StorageBackend>,
    header: FileHeader,
}

impl RawNodeFile {
    /// Opens the node file at `path` without write access.
    pub fn open(path: &Path) -> CoreResult<Self> {
        if !path.is_file() {
            return Err(CoreError::invalid_operation(format!(
                "no node file at {}",
                path.display()
            )));
        }
        let backend = FileBackend::open_read_only(path)?;
        Self::from_backend(Box::new(backend))
    }

    /// Wraps an already opened backend.
    pub fn from_backend(backend: Box<dyn StorageBackend>) -> CoreResult<Self> {
        let header = read_header(backend.as_ref())?;
        Ok(Self { backend, header })
    }

    /// Returns the decoded header.
    #[must_use]
    pub fn header(&self) -> FileHeader {
        self.header
    }

    /// Total file size in bytes.
    pub fn size(&self) -> CoreResult<u64> {
        Ok(self.backend.size()?)
    }

    /// Reads one slot.
    pub fn slot(&self, id: EntityId) -> CoreResult<RawSlot> {
        if id.as_u32() >= self.header.metadata.capacity {
            return Err(CoreError::NodeNotFound { id });
        }
        let data = self
            .backend
            .read_at(self.header.slot_offset(id), self.header.slot_size())?;
        RawSlot::decode(id, &data)
    }

    /// Reads the slots in `range`, clamped to the capacity.
    pub fn slots(&self, range: Range<u32>) -> CoreResult<Vec<RawSlot>> {
        read_slots(self.backend.as_ref(), &self.header, range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Name;
    use chessdb_storage::InMemoryBackend;
    use tempfile::tempdir;

    fn sample_metadata() -> NodeMetadata {
        NodeMetadata {
            root: Some(EntityId::new(1)),
            live_count: 2,
            capacity: 3,
            free_list_head: Some(EntityId::new(2)),
        }
    }

    #[test]
    fn header_roundtrip() {
        let mut header = FileHeader::new(24);
        header.metadata = sample_metadata();

        let encoded = header.encode();
        assert_eq!(encoded.len(), HEADER_SIZE);
        assert_eq!(FileHeader::decode(&encoded).unwrap(), header);
    }

    #[test]
    fn header_detects_corruption() {
        let mut encoded = FileHeader::new(24).encode();
        encoded[12] ^= 0xFF;
        assert!(matches!(
            FileHeader::decode(&encoded),
            Err(CoreError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn header_rejects_bad_magic() {
        let mut encoded = FileHeader::new(24).encode();
        encoded[0] = b'X';
        assert!(matches!(
            FileHeader::decode(&encoded),
            Err(CoreError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn slot_roundtrip_keeps_links() {
        let mut node = Node::new(EntityId::new(5), Name::new("Tal"));
        node.left = Some(EntityId::new(2));
        node.right = None;
        node.balance = -1;

        let bytes = encode_slot(&node, Name::SERIALIZED_LENGTH).unwrap();
        let raw = RawSlot::decode(EntityId::new(5), &bytes).unwrap();
        assert!(!raw.tombstoned);
        assert_eq!(raw.balance, -1);
        assert_eq!(raw.left, Some(EntityId::new(2)));
        assert_eq!(raw.right, None);

        let decoded: Node<Name> = raw.into_node().unwrap();
        assert_eq!(decoded.record.unwrap().name, "Tal");
    }

    #[test]
    fn tombstone_slot_is_zero_filled() {
        let node: Node<Name> = Node::tombstone(EntityId::new(1), Some(EntityId::new(0)));
        let bytes = encode_slot(&node, Name::SERIALIZED_LENGTH).unwrap();
        assert_eq!(bytes.len(), SLOT_OVERHEAD + Name::SERIALIZED_LENGTH);
        assert!(bytes[SLOT_OVERHEAD..].iter().all(|&b| b == 0));
    }

    #[test]
    fn put_get_over_memory_backend() {
        let mut store: PagedNodeStore<Name> =
            PagedNodeStore::create(Box::new(InMemoryBackend::new()), false).unwrap();

        store.put_node(Node::new(EntityId::new(0), Name::new("Kasparov"))).unwrap();
        store.put_node(Node::new(EntityId::new(1), Name::new("Karpov"))).unwrap();
        assert!(store.get_node(EntityId::new(0)).is_err());

        store
            .set_metadata(NodeMetadata {
                root: Some(EntityId::new(0)),
                live_count: 2,
                capacity: 2,
                free_list_head: None,
            })
            .unwrap();

        let node = store.get_node(EntityId::new(1)).unwrap();
        assert_eq!(node.record.unwrap().name, "Karpov");

        let range = store.get_node_range(0..100).unwrap();
        assert_eq!(range.len(), 2);
    }

    #[test]
    fn create_over_non_empty_storage_fails() {
        let backend = InMemoryBackend::with_data(vec![1, 2, 3]);
        let result: CoreResult<PagedNodeStore<Name>> = PagedNodeStore::create(Box::new(backend), false);
        assert!(matches!(result, Err(CoreError::InvalidOperation { .. })));
    }

    #[test]
    fn file_persistence_and_raw_view() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("names.chx");

        {
            let mut store: PagedNodeStore<Name> = PagedNodeStore::create_file(&path, true).unwrap();
            store.put_node(Node::new(EntityId::new(0), Name::new("Botvinnik"))).unwrap();
            store.put_node(Node::tombstone(EntityId::new(1), None)).unwrap();
            store
                .set_metadata(NodeMetadata {
                    root: Some(EntityId::new(0)),
                    live_count: 1,
                    capacity: 2,
                    free_list_head: Some(EntityId::new(1)),
                })
                .unwrap();
            store.close().unwrap();
            assert!(matches!(
                store.get_node(EntityId::new(0)),
                Err(CoreError::IndexClosed)
            ));
        }

        let store: PagedNodeStore<Name> = PagedNodeStore::open_file(&path, true).unwrap();
        assert_eq!(store.metadata().live_count, 1);
        assert_eq!(
            store.get_node(EntityId::new(0)).unwrap().record.unwrap().name,
            "Botvinnik"
        );

        let raw = RawNodeFile::open(&path).unwrap();
        assert_eq!(raw.header().record_len as usize, Name::SERIALIZED_LENGTH);
        let slots = raw.slots(0..2).unwrap();
        assert!(!slots[0].tombstoned);
        assert!(slots[1].tombstoned);
    }

    #[test]
    fn raw_view_reads_write_protected_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("archive.chx");
        {
            let mut store: PagedNodeStore<Name> = PagedNodeStore::create_file(&path, false).unwrap();
            store.put_node(Node::new(EntityId::new(0), Name::new("Euwe"))).unwrap();
            store
                .set_metadata(NodeMetadata {
                    root: Some(EntityId::new(0)),
                    live_count: 1,
                    capacity: 1,
                    free_list_head: None,
                })
                .unwrap();
            store.close().unwrap();
        }
        let before = std::fs::read(&path).unwrap();
        let mut permissions = std::fs::metadata(&path).unwrap().permissions();
        permissions.set_readonly(true);
        std::fs::set_permissions(&path, permissions).unwrap();

        let raw = RawNodeFile::open(&path).unwrap();
        assert_eq!(raw.header().metadata.live_count, 1);
        assert!(!raw.slot(EntityId::new(0)).unwrap().tombstoned);
        drop(raw);
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn open_rejects_record_length_mismatch() {
        let mut backend = InMemoryBackend::new();
        backend.write_at(0, &FileHeader::new(99).encode()).unwrap();

        let result: CoreResult<PagedNodeStore<Name>> = PagedNodeStore::open(Box::new(backend), false);
        assert!(matches!(result, Err(CoreError::InvalidFormat { .. })));
    }

    #[test]
    fn open_rejects_truncated_file() {
        let mut header = FileHeader::new(Name::SERIALIZED_LENGTH as u32);
        header.metadata.capacity = 4;
        let mut backend = InMemoryBackend::new();
        backend.write_at(0, &header.encode()).unwrap();

        let result: CoreResult<PagedNodeStore<Name>> = PagedNodeStore::open(Box::new(backend), false);
        assert!(matches!(result, Err(CoreError::InvalidFormat { .. })));
    }

    #[test]
    fn open_file_does_not_create_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.chx");

        let result: CoreResult<PagedNodeStore<Name>> = PagedNodeStore::open_file(&path, false);
        assert!(matches!(result, Err(CoreError::Storage(_))));
        assert!(!path.exists());
        assert!(RawNodeFile::open(&path).is_err());
    }
}
