//! Byte sources: short-lived, read-only access to the contents of one file.
//!
//! A query opens a source, reads the header and at most one archive region
//! from it, and drops it before returning. Sources are never shared between
//! calls.

use fs2::FileExt;
use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Positioned, read-only access to a sequence of bytes.
pub trait ByteSource {
    /// Total length of the source in bytes.
    fn len(&self) -> u64;

    /// Returns true if the source holds no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fills `buf` with the bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns `io::ErrorKind::UnexpectedEof` if the range extends past the
    /// end of the source.
    fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()>;

    /// Reads `len` bytes starting at `offset` into a new buffer.
    ///
    /// The range is checked against [`ByteSource::len`] before anything is
    /// allocated.
    fn read_vec(&mut self, offset: u64, len: u64) -> io::Result<Vec<u8>> {
        check_range(offset, len, self.len())?;
        let len = usize::try_from(len)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "range exceeds usize"))?;
        let mut buf = vec![0u8; len];
        self.read_exact_at(offset, &mut buf)?;
        Ok(buf)
    }
}

fn check_range(offset: u64, len: u64, total: u64) -> io::Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= total => Ok(()),
        _ => Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("range {offset}+{len} out of bounds for {total} bytes"),
        )),
    }
}

/// Reads a file with seek + read calls.
#[derive(Debug)]
pub struct FileSource {
    file: File,
    len: u64,
}

impl FileSource {
    /// Opens `path` read-only.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self { file, len })
    }
}

impl ByteSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        check_range(offset, buf.len() as u64, self.len)?;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)
    }
}

/// Shared advisory lock on a file, released on drop.
#[derive(Debug)]
struct SharedLock {
    file: File,
}

impl SharedLock {
    fn acquire(file: File) -> io::Result<Self> {
        FileExt::lock_shared(&file)?;
        Ok(Self { file })
    }

    fn file(&self) -> &File {
        &self.file
    }
}

impl Drop for SharedLock {
    fn drop(&mut self) {
        // Closing the handle releases the lock anyway.
        let _ = FileExt::unlock(&self.file);
    }
}

/// Reads a file through a read-only memory map.
///
/// A shared lock is held on the file for as long as the source lives, so
/// writers that take an exclusive lock before resizing wait for the read to
/// finish.
#[derive(Debug)]
pub struct MappedSource {
    // Zero-length files cannot be mapped. Declared before `_lock` so the map
    // is released first.
    map: Option<Mmap>,
    _lock: SharedLock,
}

impl MappedSource {
    /// Opens `path` read-only, takes a shared lock on it and maps it.
    ///
    /// Blocks while another handle holds an exclusive lock on the file.
    pub fn open(path: &Path) -> io::Result<Self> {
        let lock = SharedLock::acquire(File::open(path)?)?;
        let len = usize::try_from(lock.file().metadata()?.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "file exceeds usize"))?;
        if len == 0 {
            return Ok(Self {
                map: None,
                _lock: lock,
            });
        }
        // SAFETY: the map is only sound while no other process truncates or
        // rewrites the file. The shared lock excludes writers that lock
        // exclusively before modifying it; writers ignoring advisory locks
        // can still fault reads of the map.
        let map = unsafe { MmapOptions::new().len(len).map(lock.file())? };
        Ok(Self {
            map: Some(map),
            _lock: lock,
        })
    }

    fn as_slice(&self) -> &[u8] {
        self.map.as_deref().unwrap_or(&[])
    }
}

impl ByteSource for MappedSource {
    fn len(&self) -> u64 {
        self.as_slice().len() as u64
    }

    fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        SliceSource::new(self.as_slice()).read_exact_at(offset, buf)
    }
}

/// Byte source over an in-memory buffer.
#[derive(Debug, Clone, Copy)]
pub struct SliceSource<'a> {
    bytes: &'a [u8],
}

impl<'a> SliceSource<'a> {
    /// Wraps `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }
}

impl ByteSource for SliceSource<'_> {
    fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        check_range(offset, buf.len() as u64, self.len())?;
        // In range per the check above, so both conversions fit.
        let start = offset as usize;
        buf.copy_from_slice(&self.bytes[start..start + buf.len()]);
        Ok(())
    }
}
