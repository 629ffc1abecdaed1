//! # File-Mapped Regions
//!
//! Native shared memory: a file under the temp dir mapped read-write into
//! every process that opens it.
//!
//! ## Safety Note
//!
//! Mapping a file is unsafe because another process may resize or rewrite
//! it underneath us. The mapping is only ever accessed through bounds-checked
//! byte copies, never through references into the map.

#![allow(unsafe_code)]

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use memmap2::MmapMut;
use parking_lot::Mutex;

use crate::codec::check_bounds;
use crate::error::{CodecResult, ProtocolResult};
use crate::region::Region;

/// Prefix of every region file.
pub const SHM_FILE_PREFIX: &str = "tether_shm";

/// Path of the file backing `region` of the memory set `name`.
#[must_use]
pub fn region_path(name: &str, region: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{SHM_FILE_PREFIX}_{name}_{region}"))
}

/// A region backed by a memory-mapped file.
#[derive(Debug)]
pub struct MappedRegion {
    path: PathBuf,
    map: Mutex<MmapMut>,
}

impl MappedRegion {
    /// Creates (or truncates) the backing file at `len` zero bytes and maps it.
    ///
    /// # Errors
    ///
    /// File creation, sizing, or mapping failed.
    pub fn create(path: impl AsRef<Path>, len: usize) -> ProtocolResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        file.set_len(len as u64)?;

        // SAFETY: The file was just sized by us; all access goes through
        // bounds-checked copies under the mutex.
        let map = unsafe { MmapMut::map_mut(&file)? };

        tracing::info!("Created shared region {} ({} bytes)", path.display(), len);
        Ok(Self {
            path,
            map: Mutex::new(map),
        })
    }

    /// Maps an existing backing file at its current size.
    ///
    /// # Errors
    ///
    /// The file does not exist or cannot be mapped.
    pub fn open(path: impl AsRef<Path>) -> ProtocolResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        // SAFETY: Another process may own the file, but we never hand out
        // references into the map; every access is a checked copy.
        let map = unsafe { MmapMut::map_mut(&file)? };

        tracing::info!("Opened shared region {} ({} bytes)", path.display(), map.len());
        Ok(Self {
            path,
            map: Mutex::new(map),
        })
    }

    /// Backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes dirty pages to the backing file.
    ///
    /// # Errors
    ///
    /// The OS refused the flush.
    pub fn flush(&self) -> ProtocolResult<()> {
        self.map.lock().flush()?;
        Ok(())
    }
}

impl Region for MappedRegion {
    fn len(&self) -> usize {
        self.map.lock().len()
    }

    fn read(&self, offset: usize, dst: &mut [u8]) -> CodecResult<()> {
        let map = self.map.lock();
        check_bounds(map.len(), offset, dst.len())?;
        dst.copy_from_slice(&map[offset..offset + dst.len()]);
        Ok(())
    }

    fn write(&self, offset: usize, src: &[u8]) -> CodecResult<()> {
        let mut map = self.map.lock();
        check_bounds(map.len(), offset, src.len())?;
        map[offset..offset + src.len()].copy_from_slice(src);
        Ok(())
    }
}
