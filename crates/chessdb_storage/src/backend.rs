//! The byte-store contract shared by every backend.

use crate::error::StorageResult;

/// Random-access byte storage underneath one index file.
///
/// A backend holds a flat byte image and nothing else. Header layout, slot
/// size and record encoding are decided by `chessdb_core`; the backend only
/// moves bytes between absolute offsets and the medium.
///
/// # Contract
///
/// - `read_at` returns what the most recent writes left in that range and
///   fails with `ReadPastEnd` instead of returning a short buffer
/// - `write_at` beyond the end grows the image and zero-fills any gap
/// - `append` writes at the current end and returns that offset
/// - `flush` hands buffered bytes to the OS; `sync` also waits for the disk
/// - After `close`, all I/O fails with `StorageError::Closed`
/// - A read-only backend fails `write_at` and `append` with
///   `StorageError::ReadOnly`
///
/// Implementations are `Send + Sync` so that an index guarded by a lock can
/// move between threads.
pub trait StorageBackend: Send + Sync {
    /// Reads exactly `len` bytes at `offset`.
    ///
    /// # Errors
    ///
    /// `ReadPastEnd` if the range ends beyond [`size`](Self::size), or an
    /// I/O error from the medium.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Writes `data` at `offset`, overwriting what was there.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is read-only or the medium rejects
    /// the write.
    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()>;

    /// Writes `data` at the current end and returns the offset it landed at.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium rejects the write.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Hands buffered writes to the operating system.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Current length of the byte image.
    ///
    /// # Errors
    ///
    /// Fails once the backend is closed.
    fn size(&self) -> StorageResult<u64>;

    /// Returns true if the byte image is empty.
    ///
    /// # Errors
    ///
    /// Fails once the backend is closed.
    fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.size()? == 0)
    }

    /// Waits until every written byte is durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Makes all data durable and releases the medium.
    ///
    /// Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush or sync fails.
    fn close(&mut self) -> StorageResult<()>;
}
