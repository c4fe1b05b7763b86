//! Fixed-capacity content buffers.

use crate::error::{FsError, FsResult};

/// Default capacity of a file buffer: one page.
pub const PAGE_SIZE: usize = 4096;

/// Backing storage for one regular file.
///
/// Capacity is fixed at allocation; the buffer is never grown or shrunk.
#[derive(Debug)]
pub struct ContentBuffer {
    bytes: Box<[u8]>,
}

impl ContentBuffer {
    /// Allocate a zeroed buffer, reporting allocator failure instead of aborting.
    pub fn allocate(capacity: usize) -> FsResult<Self> {
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(capacity).map_err(|e| {
            FsError::ResourceExhausted(format!("content buffer of {} bytes: {}", capacity, e))
        })?;
        bytes.resize(capacity, 0);
        Ok(Self {
            bytes: bytes.into_boxed_slice(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Copy `data` to the start of the buffer.
    pub fn store_at_start(&mut self, data: &[u8]) -> FsResult<()> {
        self.store_at(0, data)
    }

    /// Copy `data` at `offset`, rejecting anything that would run past capacity.
    pub fn store_at(&mut self, offset: usize, data: &[u8]) -> FsResult<()> {
        let end = offset
            .checked_add(data.len())
            .filter(|&end| end <= self.capacity())
            .ok_or_else(|| {
                FsError::ResourceExhausted(format!(
                    "{} bytes at offset {} exceed buffer capacity {}",
                    data.len(),
                    offset,
                    self.capacity()
                ))
            })?;
        self.bytes[offset..end].copy_from_slice(data);
        Ok(())
    }
}
