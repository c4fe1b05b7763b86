//! Inode metadata and identifier allocation.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Inode identifier. Assigned in increasing order, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InodeId(pub u64);

impl fmt::Display for InodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The root directory is always the first inode handed out.
pub const ROOT_INODE: InodeId = InodeId(1);

/// POSIX mode bits.
pub mod mode {
    pub const S_IFMT: u32 = 0o170000;
    pub const S_IFDIR: u32 = 0o040000;
    pub const S_IFREG: u32 = 0o100000;
    pub const S_ISVTX: u32 = 0o001000;
    pub const S_IRWXUGO: u32 = 0o777;
    pub const S_IRUGO: u32 = 0o444;
    pub const S_IXUGO: u32 = 0o111;
    pub const S_IWUSR: u32 = 0o200;
}

/// Kind of filesystem object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InodeKind {
    File,
    Directory,
}

impl InodeKind {
    /// Derive the kind from the format bits of a mode.
    /// Anything that is not explicitly a directory is a regular file.
    pub fn from_mode(mode: u32) -> Self {
        if mode & mode::S_IFMT == mode::S_IFDIR {
            InodeKind::Directory
        } else {
            InodeKind::File
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, InodeKind::Directory)
    }

    pub fn is_file(&self) -> bool {
        matches!(self, InodeKind::File)
    }
}

/// Opaque per-inode data bound to open handles.
pub type PrivateData = Arc<dyn Any + Send + Sync>;

/// Host-side inode metadata.
///
/// File content and size live in the core's file registry, not here.
#[derive(Clone)]
pub struct Inode {
    pub id: InodeId,
    pub kind: InodeKind,
    /// Full mode including the format bits.
    pub mode: u32,
    pub nlink: u32,
    pub private: Option<PrivateData>,
}

impl Inode {
    /// Build an inode for `mode`, forcing the format bits to match the kind.
    pub fn new(id: InodeId, mode: u32) -> Self {
        let kind = InodeKind::from_mode(mode);
        let (mode, nlink) = match kind {
            // Directories start with "." plus the entry in the parent.
            InodeKind::Directory => (mode, 2),
            InodeKind::File => ((mode & !mode::S_IFMT) | mode::S_IFREG, 1),
        };
        Self {
            id,
            kind,
            mode,
            nlink,
            private: None,
        }
    }

    /// Permission bits only.
    pub fn perm(&self) -> u32 {
        self.mode & !mode::S_IFMT
    }
}

impl fmt::Debug for Inode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inode")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("mode", &format_args!("{:o}", self.mode))
            .field("nlink", &self.nlink)
            .field("private", &self.private.is_some())
            .finish()
    }
}

/// Attributes reported by `getattr`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttr {
    pub ino: InodeId,
    pub kind: InodeKind,
    pub mode: u32,
    pub nlink: u32,
    pub size: u64,
}

/// Hands out inode identifiers for one mounted instance.
#[derive(Debug)]
pub struct InodeAllocator {
    last: AtomicU64,
}

impl Default for InodeAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl InodeAllocator {
    pub fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Next identifier. The first call returns `ROOT_INODE`.
    pub fn next(&self) -> InodeId {
        InodeId(self.last.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Last identifier handed out, 0 if none.
    pub fn last(&self) -> u64 {
        self.last.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_starts_at_root() {
        let alloc = InodeAllocator::new();
        assert_eq!(alloc.next(), ROOT_INODE);
        assert_eq!(alloc.next(), InodeId(2));
        assert_eq!(alloc.last(), 2);
    }

    #[test]
    fn test_kind_from_mode() {
        assert_eq!(InodeKind::from_mode(mode::S_IFDIR | 0o755), InodeKind::Directory);
        assert_eq!(InodeKind::from_mode(0o644), InodeKind::File);
        assert_eq!(InodeKind::from_mode(mode::S_IFREG | 0o644), InodeKind::File);
    }

    #[test]
    fn test_new_file_forces_regular_bits() {
        let inode = Inode::new(InodeId(5), 0o644);
        assert_eq!(inode.mode, mode::S_IFREG | 0o644);
        assert_eq!(inode.nlink, 1);
        assert_eq!(inode.perm(), 0o644);
    }

    #[test]
    fn test_new_directory_has_two_links() {
        let inode = Inode::new(InodeId(6), mode::S_IFDIR | 0o700);
        assert!(inode.kind.is_dir());
        assert_eq!(inode.nlink, 2);
    }
}
