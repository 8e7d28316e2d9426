//! File-based storage backend.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// An index file on disk.
///
/// Every read and write addresses an absolute offset; the cursor position
/// left behind by one call is never relied on by the next. The logical
/// length is tracked in memory so that bounds checks need no `stat` call.
///
/// # Durability
///
/// - `flush()` pushes buffered data to the OS
/// - `sync()` waits until data and metadata are on disk
/// - `close()` does both, then drops the handle
///
/// # Example
///
/// ```no_run
/// use chessdb_storage::{StorageBackend, FileBackend};
/// use std::path::Path;
///
/// let mut backend = FileBackend::open(Path::new("players.chx")).unwrap();
/// backend.write_at(0, b"header").unwrap();
/// backend.close().unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    handle: Mutex<Option<Handle>>,
    read_only: bool,
}

#[derive(Debug)]
struct Handle {
    file: File,
    len: u64,
}

impl Handle {
    fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> StorageResult<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf).map_err(|err| {
            if err.kind() == io::ErrorKind::UnexpectedEof {
                StorageError::Corrupted(format!(
                    "file ended before offset {} (expected length {})",
                    offset + buf.len() as u64,
                    self.len
                ))
            } else {
                StorageError::Io(err)
            }
        })
    }

    fn write_all_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(data)?;
        self.len = self.len.max(offset + data.len() as u64);
        Ok(())
    }
}

impl FileBackend {
    /// Opens the file at `path`, creating it empty if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        Self::with_options(path, OpenOptions::new().write(true).create(true), false)
    }

    /// Opens the file at `path`, which must already exist.
    ///
    /// # Errors
    ///
    /// Returns an I/O error of kind `NotFound` if the file is missing.
    pub fn open_existing(path: &Path) -> StorageResult<Self> {
        Self::with_options(path, OpenOptions::new().write(true), false)
    }

    /// Opens the existing file at `path` for reading only.
    ///
    /// Works on files without write permission. `write_at` and `append`
    /// fail with [`StorageError::ReadOnly`]; `flush`, `sync` and `close`
    /// have nothing to do.
    ///
    /// # Errors
    ///
    /// Returns an I/O error of kind `NotFound` if the file is missing.
    pub fn open_read_only(path: &Path) -> StorageResult<Self> {
        Self::with_options(path, &mut OpenOptions::new(), true)
    }

    /// Opens or creates the file at `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created or the file cannot
    /// be opened.
    pub fn open_with_create_dirs(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::open(path)
    }

    fn with_options(path: &Path, options: &mut OpenOptions, read_only: bool) -> StorageResult<Self> {
        let file = options.read(true).truncate(false).open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            handle: Mutex::new(Some(Handle { file, len })),
            read_only,
        })
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true until [`StorageBackend::close`] has run.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.handle.lock().is_some()
    }

    /// Returns true if the file was opened with [`open_read_only`](Self::open_read_only).
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn handle_mut(&mut self) -> StorageResult<&mut Handle> {
        self.handle.get_mut().as_mut().ok_or(StorageError::Closed)
    }

    fn writable_handle(&mut self) -> StorageResult<&mut Handle> {
        let read_only = self.read_only;
        let handle = self.handle_mut()?;
        if read_only {
            return Err(StorageError::ReadOnly);
        }
        Ok(handle)
    }
}

impl StorageBackend for FileBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let mut guard = self.handle.lock();
        let handle = guard.as_mut().ok_or(StorageError::Closed)?;
        if offset.saturating_add(len as u64) > handle.len {
            return Err(StorageError::ReadPastEnd {
                offset,
                len,
                size: handle.len,
            });
        }
        let mut buf = vec![0u8; len];
        if len > 0 {
            handle.read_exact_at(offset, &mut buf)?;
        }
        Ok(buf)
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()> {
        let handle = self.writable_handle()?;
        if data.is_empty() {
            return Ok(());
        }
        handle.write_all_at(offset, data)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let handle = self.writable_handle()?;
        let offset = handle.len;
        if !data.is_empty() {
            handle.write_all_at(offset, data)?;
        }
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        let read_only = self.read_only;
        let handle = self.handle_mut()?;
        if !read_only {
            handle.file.flush()?;
        }
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        self.handle
            .lock()
            .as_ref()
            .map(|handle| handle.len)
            .ok_or(StorageError::Closed)
    }

    fn sync(&mut self) -> StorageResult<()> {
        let read_only = self.read_only;
        let handle = self.handle_mut()?;
        if !read_only {
            handle.file.sync_all()?;
        }
        Ok(())
    }

    fn close(&mut self) -> StorageResult<()> {
        let Some(mut handle) = self.handle.get_mut().take() else {
            return Ok(());
        };
        if self.read_only {
            return Ok(());
        }
        handle.file.flush()?;
        handle.file.sync_all()?;
        Ok(())
    }
}
