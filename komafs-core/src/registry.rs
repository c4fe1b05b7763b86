//! Registry of file records backing live regular-file inodes.

use std::collections::BTreeMap;
use std::sync::Mutex;

use tracing::debug;

use crate::buffer::ContentBuffer;
use crate::error::{FsError, FsResult};
use crate::inode::InodeId;

/// Content of one regular file: its buffer and the number of stored bytes.
#[derive(Debug)]
pub struct FileRecord {
    inode: InodeId,
    buffer: ContentBuffer,
    size: usize,
}

impl FileRecord {
    pub fn new(inode: InodeId, buffer: ContentBuffer) -> Self {
        Self {
            inode,
            buffer,
            size: 0,
        }
    }

    pub fn inode(&self) -> InodeId {
        self.inode
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    pub fn buffer(&self) -> &ContentBuffer {
        &self.buffer
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut ContentBuffer {
        &mut self.buffer
    }

    pub(crate) fn set_size(&mut self, size: usize) {
        debug_assert!(size <= self.buffer.capacity());
        self.size = size;
    }
}

/// Identifier-keyed collection of file records for one mounted instance.
///
/// Keys are allocated in increasing order, so iteration follows creation order.
#[derive(Debug, Default)]
pub struct FileRegistry {
    records: Mutex<BTreeMap<InodeId, FileRecord>>,
}

impl FileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record for `inode`. An inode may own at most one record.
    pub fn register(&self, inode: InodeId, buffer: ContentBuffer) -> FsResult<()> {
        let mut records = self.records.lock().map_err(|_| FsError::LockPoisoned)?;
        if records.contains_key(&inode) {
            return Err(FsError::InvalidArgument(format!(
                "inode {} already has a file record",
                inode
            )));
        }
        records.insert(inode, FileRecord::new(inode, buffer));
        debug!(%inode, files = records.len(), "registered file record");
        Ok(())
    }

    /// Whether a record exists for `inode`.
    pub fn contains(&self, inode: InodeId) -> FsResult<bool> {
        let records = self.records.lock().map_err(|_| FsError::LockPoisoned)?;
        Ok(records.contains_key(&inode))
    }

    /// Run `f` against the record for `inode`.
    pub fn find<R>(&self, inode: InodeId, f: impl FnOnce(&FileRecord) -> R) -> FsResult<R> {
        let records = self.records.lock().map_err(|_| FsError::LockPoisoned)?;
        records.get(&inode).map(f).ok_or(FsError::NotFound(inode))
    }

    /// Run `f` against the record for `inode` with mutable access.
    pub fn find_mut<R>(
        &self,
        inode: InodeId,
        f: impl FnOnce(&mut FileRecord) -> FsResult<R>,
    ) -> FsResult<R> {
        let mut records = self.records.lock().map_err(|_| FsError::LockPoisoned)?;
        let record = records.get_mut(&inode).ok_or(FsError::NotFound(inode))?;
        f(record)
    }

    /// Stored size of the file behind `inode`.
    pub fn size_of(&self, inode: InodeId) -> FsResult<usize> {
        self.find(inode, FileRecord::size)
    }

    /// Remove the record for `inode`, releasing its buffer when dropped.
    pub fn deregister(&self, inode: InodeId) -> FsResult<FileRecord> {
        let mut records = self.records.lock().map_err(|_| FsError::LockPoisoned)?;
        records.remove(&inode).ok_or(FsError::NotFound(inode))
    }

    pub fn len(&self) -> FsResult<usize> {
        let records = self.records.lock().map_err(|_| FsError::LockPoisoned)?;
        Ok(records.len())
    }

    pub fn is_empty(&self) -> FsResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Registered inode ids in creation order.
    pub fn inodes(&self) -> FsResult<Vec<InodeId>> {
        let records = self.records.lock().map_err(|_| FsError::LockPoisoned)?;
        Ok(records.keys().copied().collect())
    }

    /// Release every record and its buffer. Returns how many were released.
    pub fn teardown(&self) -> FsResult<usize> {
        let mut records = self.records.lock().map_err(|_| FsError::LockPoisoned)?;
        let drained = std::mem::take(&mut *records);
        let mut released = 0;
        for (inode, record) in drained {
            debug!(%inode, capacity = record.capacity(), "releasing file buffer");
            drop(record);
            released += 1;
        }
        Ok(released)
    }
}
