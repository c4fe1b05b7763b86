//! Open file handles.

use std::fmt;

use crate::error::FsResult;
use crate::fs::KomaFs;
use crate::inode::{InodeId, PrivateData};

/// An open regular file: the inode, a read cursor, and the inode's private data.
pub struct FileHandle {
    fs: KomaFs,
    ino: InodeId,
    pos: u64,
    private: Option<PrivateData>,
}

impl FileHandle {
    pub(crate) fn new(fs: KomaFs, ino: InodeId, private: Option<PrivateData>) -> Self {
        Self {
            fs,
            ino,
            pos: 0,
            private,
        }
    }

    pub fn ino(&self) -> InodeId {
        self.ino
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn seek(&mut self, pos: u64) {
        self.pos = pos;
    }

    /// Data bound by `KomaFs::set_private` before this handle was opened.
    pub fn private_data(&self) -> Option<&PrivateData> {
        self.private.as_ref()
    }

    /// Read into `buf` from the current position.
    pub fn read(&mut self, buf: &mut [u8]) -> FsResult<usize> {
        self.fs.read(self.ino, buf, buf.len(), &mut self.pos)
    }

    /// Read everything from the current position to the end.
    pub fn read_to_end(&mut self) -> FsResult<Vec<u8>> {
        let size = self.fs.getattr(self.ino)?.size;
        let mut buf = vec![0u8; size.saturating_sub(self.pos) as usize];
        let n = self.read(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Replace the file content with `data`. The cursor is not consulted or moved.
    pub fn write(&mut self, data: &[u8]) -> FsResult<usize> {
        self.fs.write(self.ino, data, data.len())
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("ino", &self.ino)
            .field("pos", &self.pos)
            .field("private", &self.private.is_some())
            .finish()
    }
}
