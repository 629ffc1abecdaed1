//! Memory regions.
//!
//! A [`Region`] is a flat byte range both sides can see. Accesses are plain
//! byte copies at an offset; the protocol tolerates torn reads, so no
//! operation here orders one side against the other.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::codec::check_bounds;
use crate::error::CodecResult;

/// A shared byte range.
pub trait Region: Send + Sync {
    /// Size in bytes.
    fn len(&self) -> usize;

    /// `true` if the region has no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies `dst.len()` bytes starting at `offset` into `dst`.
    ///
    /// # Errors
    ///
    /// Out-of-bounds access.
    fn read(&self, offset: usize, dst: &mut [u8]) -> CodecResult<()>;

    /// Copies `src` into the region starting at `offset`.
    ///
    /// # Errors
    ///
    /// Out-of-bounds access.
    fn write(&self, offset: usize, src: &[u8]) -> CodecResult<()>;
}

impl<R: Region + ?Sized> Region for Arc<R> {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn read(&self, offset: usize, dst: &mut [u8]) -> CodecResult<()> {
        (**self).read(offset, dst)
    }

    fn write(&self, offset: usize, src: &[u8]) -> CodecResult<()> {
        (**self).write(offset, src)
    }
}

/// In-process region. Clones share the same bytes.
///
/// The lock is held for one copy at a time; it keeps the buffer sound in
/// Rust terms and says nothing about protocol ordering.
#[derive(Clone, Debug)]
pub struct HeapRegion {
    bytes: Arc<RwLock<Box<[u8]>>>,
}

impl HeapRegion {
    /// Zero-filled region of `len` bytes.
    #[must_use]
    pub fn zeroed(len: usize) -> Self {
        Self {
            bytes: Arc::new(RwLock::new(vec![0u8; len].into_boxed_slice())),
        }
    }

    /// Copy of the whole region.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.read().to_vec()
    }
}

impl Region for HeapRegion {
    fn len(&self) -> usize {
        self.bytes.read().len()
    }

    fn read(&self, offset: usize, dst: &mut [u8]) -> CodecResult<()> {
        let bytes = self.bytes.read();
        check_bounds(bytes.len(), offset, dst.len())?;
        dst.copy_from_slice(&bytes[offset..offset + dst.len()]);
        Ok(())
    }

    fn write(&self, offset: usize, src: &[u8]) -> CodecResult<()> {
        let mut bytes = self.bytes.write();
        check_bounds(bytes.len(), offset, src.len())?;
        bytes[offset..offset + src.len()].copy_from_slice(src);
        Ok(())
    }
}
