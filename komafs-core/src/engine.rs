//! Bounded read and write against a file record.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FsError, FsResult};
use crate::obfuscation::{covered_len, decode_copy, key_for, xor_words, TRAILER};
use crate::registry::FileRecord;

/// How content is laid out at rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentMode {
    /// Bytes are stored as written.
    #[default]
    Plain,
    /// A trailer is appended and the stored words are XORed with the stored size.
    Obfuscated,
}

/// Read/write state machine shared by every file of a mounted instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadWriteEngine {
    mode: ContentMode,
}

/// Number of bytes a read of `count` at `pos` may return from `size` stored bytes.
///
/// A cursor at or past the end yields 0.
pub fn read_len(size: usize, count: usize, pos: u64) -> usize {
    match usize::try_from(pos) {
        Ok(pos) if pos < size => count.min(size - pos),
        _ => 0,
    }
}

impl ReadWriteEngine {
    pub fn new(mode: ContentMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ContentMode {
        self.mode
    }

    /// Bytes a write adds on top of the caller's payload.
    pub fn overhead(&self) -> usize {
        match self.mode {
            ContentMode::Plain => 0,
            ContentMode::Obfuscated => TRAILER.len(),
        }
    }

    /// Copy up to `count` stored bytes starting at `*pos` into `dst` and advance `*pos`.
    pub fn read(
        &self,
        record: &FileRecord,
        dst: &mut [u8],
        count: usize,
        pos: &mut u64,
    ) -> FsResult<usize> {
        let size = record.size();
        let len = read_len(size, count, *pos);
        if len == 0 {
            return Ok(0);
        }
        if dst.len() < len {
            return Err(FsError::FaultyBuffer {
                needed: len,
                supplied: dst.len(),
            });
        }

        // read_len guarantees pos < size here
        let start = *pos as usize;
        match self.mode {
            ContentMode::Plain => {
                dst[..len].copy_from_slice(&record.buffer().as_slice()[start..start + len]);
            }
            ContentMode::Obfuscated => {
                let plain = decode_copy(record.buffer().as_slice(), size);
                dst[..len].copy_from_slice(&plain[start..start + len]);
            }
        }
        *pos += len as u64;

        debug!(inode = %record.inode(), len, pos = *pos, "read");
        Ok(len)
    }

    /// Replace the file content with the first `count` bytes of `src`.
    ///
    /// Every write lands at offset 0 and truncates; there is no cursor.
    /// Returns the new stored size.
    pub fn write(&self, record: &mut FileRecord, src: &[u8], count: usize) -> FsResult<usize> {
        if src.len() < count {
            return Err(FsError::FaultyBuffer {
                needed: count,
                supplied: src.len(),
            });
        }

        let total = count.checked_add(self.overhead()).ok_or_else(|| {
            FsError::InvalidArgument(format!("write of {} bytes overflows", count))
        })?;
        let capacity = record.capacity();
        if total > capacity {
            return Err(FsError::ResourceExhausted(format!(
                "write of {} bytes exceeds file capacity {}",
                total, capacity
            )));
        }

        let buffer = record.buffer_mut();
        buffer.store_at_start(&src[..count])?;
        if self.mode == ContentMode::Obfuscated {
            buffer.store_at(count, TRAILER)?;
            let covered = covered_len(total, capacity);
            xor_words(&mut buffer.as_mut_slice()[..covered], key_for(total));
        }
        record.set_size(total);

        debug!(inode = %record.inode(), count, size = total, "write");
        Ok(total)
    }
}
