//! Underlying stores
//!
//! Positional byte stores a `BufferedChannel` drains into and reads back from.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

/// Seekable, appendable byte store beneath a buffered channel
///
/// All access is positional so that reads of flushed bytes never contend
/// with the channel's write path.
pub trait LogStore: Send + Sync {
    /// Write all of `data` starting at `offset`
    fn write_all_at(&self, offset: u64, data: &[u8]) -> io::Result<()>;

    /// Read into `buf` starting at `offset`, returning the bytes read.
    /// Returns 0 at end of store.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// Current durable size in bytes
    fn size(&self) -> io::Result<u64>;

    /// Force written bytes to stable storage
    fn sync(&self, force_metadata: bool) -> io::Result<()>;

    /// Fill `buf` entirely from `offset` or fail with `UnexpectedEof`
    fn read_exact_at(&self, mut offset: u64, mut buf: &mut [u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.read_at(offset, buf) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("short read from store at offset {}", offset),
                    ))
                }
                Ok(n) => {
                    let rest = buf;
                    buf = &mut rest[n..];
                    offset += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

// =============================================================================
// File Store
// =============================================================================

/// File-backed store using positional I/O
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    file: File,
}

impl FileStore {
    /// Open or create a log file for reading and writing
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(unix)]
impl LogStore for FileStore {
    fn write_all_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        use std::os::unix::fs::FileExt;
        self.file.write_all_at(data, offset)
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        use std::os::unix::fs::FileExt;
        self.file.read_at(buf, offset)
    }

    fn size(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn sync(&self, force_metadata: bool) -> io::Result<()> {
        if force_metadata {
            self.file.sync_all()
        } else {
            self.file.sync_data()
        }
    }
}

#[cfg(windows)]
impl LogStore for FileStore {
    fn write_all_at(&self, mut offset: u64, mut data: &[u8]) -> io::Result<()> {
        use std::os::windows::fs::FileExt;
        while !data.is_empty() {
            match self.file.seek_write(data, offset) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "failed to write whole buffer",
                    ))
                }
                Ok(n) => {
                    data = &data[n..];
                    offset += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        use std::os::windows::fs::FileExt;
        self.file.seek_read(buf, offset)
    }

    fn size(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn sync(&self, force_metadata: bool) -> io::Result<()> {
        if force_metadata {
            self.file.sync_all()
        } else {
            self.file.sync_data()
        }
    }
}

// =============================================================================
// Memory Store
// =============================================================================

/// In-memory store, useful for tests and benchmarks
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `bytes`
    pub fn with_contents(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            data: RwLock::new(bytes.into()),
        }
    }

    /// Copy of everything written so far
    pub fn contents(&self) -> Vec<u8> {
        self.data.read().clone()
    }
}

impl LogStore for MemoryStore {
    fn write_all_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        let offset = usize::try_from(offset)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "offset too large"))?;
        let end = offset + data.len();

        let mut store = self.data.write();
        if store.len() < end {
            store.resize(end, 0);
        }
        store[offset..end].copy_from_slice(data);
        Ok(())
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let store = self.data.read();
        let offset = match usize::try_from(offset) {
            Ok(off) if off < store.len() => off,
            _ => return Ok(0),
        };

        let n = buf.len().min(store.len() - offset);
        buf[..n].copy_from_slice(&store[offset..offset + n]);
        Ok(n)
    }

    fn size(&self) -> io::Result<u64> {
        Ok(self.data.read().len() as u64)
    }

    fn sync(&self, _force_metadata: bool) -> io::Result<()> {
        Ok(())
    }
}
