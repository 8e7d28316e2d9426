//! In-memory storage backend.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};

/// A byte image held in memory.
///
/// Used for unit tests and for node files that are built up and then thrown
/// away. Flush and sync do nothing.
///
/// # Example
///
/// ```rust
/// use chessdb_storage::{StorageBackend, InMemoryBackend};
///
/// let mut backend = InMemoryBackend::new();
/// assert_eq!(backend.append(b"header").unwrap(), 0);
/// backend.write_at(6, b"slot").unwrap();
/// assert_eq!(backend.bytes(), b"headerslot");
/// ```
#[derive(Debug, Default, Clone)]
pub struct InMemoryBackend {
    data: Vec<u8>,
    closed: bool,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend over an existing byte image.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data,
            closed: false,
        }
    }

    /// Returns the stored bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the backend, returning its byte image.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    fn ensure_open(&self) -> StorageResult<()> {
        if self.closed {
            Err(StorageError::Closed)
        } else {
            Ok(())
        }
    }
}

impl StorageBackend for InMemoryBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        self.ensure_open()?;
        let size = self.data.len() as u64;
        let end = offset.saturating_add(len as u64);
        if end > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }
        Ok(self.data[offset as usize..end as usize].to_vec())
    }

    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> StorageResult<()> {
        self.ensure_open()?;
        let start = offset as usize;
        let end = start + bytes.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[start..end].copy_from_slice(bytes);
        Ok(())
    }

    fn append(&mut self, bytes: &[u8]) -> StorageResult<u64> {
        self.ensure_open()?;
        let offset = self.data.len() as u64;
        self.data.extend_from_slice(bytes);
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.ensure_open()
    }

    fn size(&self) -> StorageResult<u64> {
        self.ensure_open()?;
        Ok(self.data.len() as u64)
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.ensure_open()
    }

    fn close(&mut self) -> StorageResult<()> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let backend = InMemoryBackend::new();
        assert_eq!(backend.size().unwrap(), 0);
        assert!(backend.bytes().is_empty());
    }

    #[test]
    fn header_then_slots() {
        let mut backend = InMemoryBackend::new();
        assert_eq!(backend.append(b"HEAD").unwrap(), 0);
        backend.write_at(4, b"s0s0").unwrap();
        backend.write_at(8, b"s1s1").unwrap();
        backend.write_at(4, b"S0S0").unwrap();

        assert_eq!(backend.read_at(4, 8).unwrap(), b"S0S0s1s1");
        assert_eq!(backend.size().unwrap(), 12);
    }

    #[test]
    fn sparse_write_zero_fills() {
        let mut backend = InMemoryBackend::new();
        backend.write_at(4, b"ab").unwrap();
        assert_eq!(backend.into_bytes(), vec![0, 0, 0, 0, b'a', b'b']);
    }

    #[test]
    fn read_past_end_fails() {
        let backend = InMemoryBackend::with_data(b"hello".to_vec());

        assert!(matches!(
            backend.read_at(3, 10),
            Err(StorageError::ReadPastEnd { offset: 3, len: 10, size: 5 })
        ));
        assert!(matches!(
            backend.read_at(u64::MAX, 1),
            Err(StorageError::ReadPastEnd { .. })
        ));
        assert!(backend.read_at(2, 0).unwrap().is_empty());
    }

    #[test]
    fn close_rejects_further_io() {
        let mut backend = InMemoryBackend::with_data(b"Tal".to_vec());
        backend.close().unwrap();

        assert!(matches!(backend.read_at(0, 1), Err(StorageError::Closed)));
        assert!(matches!(backend.append(b"x"), Err(StorageError::Closed)));
        assert!(matches!(backend.flush(), Err(StorageError::Closed)));
        assert!(backend.close().is_ok());
        assert_eq!(backend.bytes(), b"Tal");
    }
}
