//! A mounted filesystem instance.
//!
//! `KomaFs` ties the pieces together:
//! - inode allocation and the host-side namespace
//! - the file registry holding one buffer per regular file
//! - the read/write engine (plain or obfuscated)
//!
//! Clone is cheap (just clones the Arc), so handles and sessions can share one instance.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, RwLock, RwLockWriteGuard};

use tracing::{debug, info, warn};

use crate::buffer::ContentBuffer;
use crate::engine::{ContentMode, ReadWriteEngine};
use crate::error::{FsError, FsResult};
use crate::handle::FileHandle;
use crate::inode::{mode, FileAttr, Inode, InodeAllocator, InodeId, InodeKind, PrivateData};
use crate::mount::FsType;
use crate::namespace::{DirEntry, Namespace, NAME_MAX};
use crate::options::MountOptions;
use crate::registry::FileRegistry;

/// Change notifications delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsEvent {
    FileCreated {
        parent: InodeId,
        name: String,
        ino: InodeId,
    },
    DirectoryCreated {
        parent: InodeId,
        name: String,
        ino: InodeId,
    },
    Removed {
        parent: InodeId,
        name: String,
        ino: InodeId,
    },
    Renamed {
        old_parent: InodeId,
        old_name: String,
        new_parent: InodeId,
        new_name: String,
        ino: InodeId,
    },
}

/// Filesystem statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatFs {
    pub magic: u32,
    /// Bytes per file buffer.
    pub bsize: usize,
    pub namelen: usize,
    /// Live inodes, root included.
    pub files: usize,
    /// Regular files holding a buffer.
    pub file_records: usize,
}

#[derive(Debug)]
struct Inner {
    fs_type: FsType,
    capacity: usize,
    engine: ReadWriteEngine,
    allocator: InodeAllocator,
    namespace: RwLock<Namespace>,
    registry: FileRegistry,
    listeners: Mutex<Vec<Sender<FsEvent>>>,
}

/// One mounted instance. All state is in memory and lost on unmount.
#[derive(Debug, Clone)]
pub struct KomaFs {
    inner: Arc<Inner>,
}

impl KomaFs {
    /// Build the superblock and root directory for a mount of `fs_type`.
    pub fn fill_super(fs_type: &FsType, options: &MountOptions) -> FsResult<Self> {
        options.validate()?;

        let mut fs_type = fs_type.clone();
        if let Some(directories) = options.directories {
            fs_type.directories = directories;
        }
        if let Some(obfuscate) = options.obfuscate {
            fs_type.content_mode = if obfuscate {
                ContentMode::Obfuscated
            } else {
                ContentMode::Plain
            };
        }

        let allocator = InodeAllocator::new();
        let root = Inode::new(
            allocator.next(),
            mode::S_IFDIR | mode::S_IRUGO | mode::S_IXUGO | mode::S_IWUSR,
        );

        info!(
            fs_type = %fs_type.name,
            magic = %format!("{:#010X}", fs_type.magic),
            capacity = options.capacity,
            mode = ?fs_type.content_mode,
            directories = fs_type.directories,
            "filled superblock"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                engine: ReadWriteEngine::new(fs_type.content_mode),
                fs_type,
                capacity: options.capacity,
                allocator,
                namespace: RwLock::new(Namespace::new(root)),
                registry: FileRegistry::new(),
                listeners: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn fs_type(&self) -> &FsType {
        &self.inner.fs_type
    }

    pub fn magic(&self) -> u32 {
        self.inner.fs_type.magic
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn content_mode(&self) -> ContentMode {
        self.inner.engine.mode()
    }

    /// Largest payload a single write can store.
    pub fn max_payload(&self) -> usize {
        self.inner
            .capacity
            .saturating_sub(self.inner.engine.overhead())
    }

    pub fn root(&self) -> InodeId {
        crate::inode::ROOT_INODE
    }

    /// The file registry backing this instance.
    pub fn registry(&self) -> &FileRegistry {
        &self.inner.registry
    }

    /// Receive change notifications from now on.
    pub fn subscribe(&self) -> Receiver<FsEvent> {
        let (tx, rx) = mpsc::channel();
        if let Ok(mut listeners) = self.inner.listeners.lock() {
            listeners.push(tx);
        }
        rx
    }

    fn notify(&self, event: FsEvent) {
        if let Ok(mut listeners) = self.inner.listeners.lock() {
            listeners.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }

    fn namespace_mut(&self) -> FsResult<RwLockWriteGuard<'_, Namespace>> {
        self.inner.namespace.write().map_err(|_| FsError::LockPoisoned)
    }

    fn require_directories(&self, op: &'static str) -> FsResult<()> {
        if self.inner.fs_type.directories {
            Ok(())
        } else {
            Err(FsError::Unsupported(op))
        }
    }

    /// Allocate an inode, and a buffer for regular files, and bind it to `name`.
    ///
    /// Without directory support every create produces a regular file.
    fn create_locked(
        &self,
        ns: &mut Namespace,
        parent: InodeId,
        name: &str,
        mut mode: u32,
    ) -> FsResult<InodeId> {
        ns.check_vacant(parent, name)?;
        if !self.inner.fs_type.directories {
            mode &= !mode::S_IFMT;
        }

        let ino = self.inner.allocator.next();
        let inode = Inode::new(ino, mode);

        if inode.kind.is_file() {
            // The name is known vacant, so allocation is the only step that can fail.
            let buffer = ContentBuffer::allocate(self.inner.capacity)?;
            ns.instantiate(parent, name, inode)?;
            self.inner.registry.register(ino, buffer)?;
            debug!(%parent, name, %ino, "created file");
        } else {
            ns.instantiate(parent, name, inode)?;
            debug!(%parent, name, %ino, "created directory inode");
        }
        Ok(ino)
    }

    /// Create `name` under `parent`. The kind follows the format bits of `mode`.
    pub fn create(&self, parent: InodeId, name: &str, mode: u32) -> FsResult<InodeId> {
        let ino = {
            let mut ns = self.namespace_mut()?;
            self.create_locked(&mut ns, parent, name, mode)?
        };
        let kind = InodeKind::from_mode(mode);
        let event = if kind.is_dir() && self.inner.fs_type.directories {
            FsEvent::DirectoryCreated {
                parent,
                name: name.to_string(),
                ino,
            }
        } else {
            FsEvent::FileCreated {
                parent,
                name: name.to_string(),
                ino,
            }
        };
        self.notify(event);
        Ok(ino)
    }

    /// Create a directory and account for its ".." link in the parent.
    pub fn mkdir(&self, parent: InodeId, name: &str, perm: u32) -> FsResult<InodeId> {
        self.require_directories("mkdir")?;
        let mode = (perm & (mode::S_IRWXUGO | mode::S_ISVTX)) | mode::S_IFDIR;

        let ino = {
            let mut ns = self.namespace_mut()?;
            let ino = self.create_locked(&mut ns, parent, name, mode)?;
            ns.get_mut(parent)?.nlink += 1;
            ino
        };
        self.notify(FsEvent::DirectoryCreated {
            parent,
            name: name.to_string(),
            ino,
        });
        Ok(ino)
    }

    /// Remove an empty directory.
    pub fn rmdir(&self, parent: InodeId, name: &str) -> FsResult<()> {
        self.require_directories("rmdir")?;
        let ino = {
            let mut ns = self.namespace_mut()?;
            let ino = ns.lookup(parent, name)?;
            if !ns.get(ino)?.kind.is_dir() {
                return Err(FsError::NotADirectory(name.to_string()));
            }
            if !ns.is_empty_dir(ino)? {
                return Err(FsError::NotEmpty(name.to_string()));
            }
            ns.remove(parent, name)?;
            ns.get_mut(parent)?.nlink -= 1;
            ino
        };
        debug!(%parent, name, %ino, "removed directory");
        self.notify(FsEvent::Removed {
            parent,
            name: name.to_string(),
            ino,
        });
        Ok(())
    }

    /// Move `old_name` under `old_parent` to `new_name` under `new_parent`.
    ///
    /// An existing destination is replaced. A replaced regular file keeps its
    /// registry record: rename never touches the registry.
    pub fn rename(
        &self,
        old_parent: InodeId,
        old_name: &str,
        new_parent: InodeId,
        new_name: &str,
    ) -> FsResult<()> {
        self.require_directories("rename")?;
        let ino = {
            let mut ns = self.namespace_mut()?;
            let ino = ns.lookup(old_parent, old_name)?;
            if old_parent == new_parent && old_name == new_name {
                return Ok(());
            }
            let moving_dir = ns.get(ino)?.kind.is_dir();
            if moving_dir && ns.is_within(new_parent, ino) {
                return Err(FsError::InvalidArgument(format!(
                    "cannot move {} beneath itself",
                    old_name
                )));
            }

            match ns.lookup(new_parent, new_name) {
                Ok(target) => {
                    let target_is_dir = ns.get(target)?.kind.is_dir();
                    match (moving_dir, target_is_dir) {
                        (false, true) => return Err(FsError::IsADirectory(new_name.to_string())),
                        (true, false) => {
                            return Err(FsError::NotADirectory(new_name.to_string()))
                        }
                        (true, true) if !ns.is_empty_dir(target)? => {
                            return Err(FsError::NotEmpty(new_name.to_string()))
                        }
                        _ => {}
                    }
                    ns.remove(new_parent, new_name)?;
                    if target_is_dir {
                        ns.get_mut(new_parent)?.nlink -= 1;
                    } else if self.inner.registry.contains(target)? {
                        warn!(
                            ino = %target,
                            name = new_name,
                            "rename replaced a file; its record stays registered until unmount"
                        );
                    }
                }
                Err(FsError::NoEntry(_)) => {}
                Err(e) => return Err(e),
            }

            ns.relink(old_parent, old_name, new_parent, new_name)?;
            if moving_dir && old_parent != new_parent {
                ns.get_mut(old_parent)?.nlink -= 1;
                ns.get_mut(new_parent)?.nlink += 1;
            }
            ino
        };
        debug!(%ino, old_name, new_name, "renamed");
        self.notify(FsEvent::Renamed {
            old_parent,
            old_name: old_name.to_string(),
            new_parent,
            new_name: new_name.to_string(),
            ino,
        });
        Ok(())
    }

    /// Remove a regular file and release its buffer.
    pub fn unlink(&self, parent: InodeId, name: &str) -> FsResult<()> {
        let ino = {
            let mut ns = self.namespace_mut()?;
            let ino = ns.lookup(parent, name)?;
            if ns.get(ino)?.kind.is_dir() {
                return Err(FsError::IsADirectory(name.to_string()));
            }
            ns.remove(parent, name)?;
            ino
        };
        match self.inner.registry.deregister(ino) {
            Ok(record) => debug!(%ino, size = record.size(), "released file record"),
            Err(FsError::NotFound(_)) => warn!(%ino, "unlinked file had no record"),
            Err(e) => return Err(e),
        }
        self.notify(FsEvent::Removed {
            parent,
            name: name.to_string(),
            ino,
        });
        Ok(())
    }

    pub fn lookup(&self, parent: InodeId, name: &str) -> FsResult<InodeId> {
        let ns = self.inner.namespace.read().map_err(|_| FsError::LockPoisoned)?;
        ns.lookup(parent, name)
    }

    /// Resolve a `/`-separated path from the root.
    pub fn resolve(&self, path: &str) -> FsResult<InodeId> {
        let ns = self.inner.namespace.read().map_err(|_| FsError::LockPoisoned)?;
        path.split('/')
            .filter(|c| !c.is_empty())
            .try_fold(ns.root(), |dir, name| ns.lookup(dir, name))
    }

    pub fn readdir(&self, dir: InodeId) -> FsResult<Vec<DirEntry>> {
        let ns = self.inner.namespace.read().map_err(|_| FsError::LockPoisoned)?;
        ns.readdir(dir)
    }

    pub fn getattr(&self, ino: InodeId) -> FsResult<FileAttr> {
        let (kind, mode, nlink) = {
            let ns = self.inner.namespace.read().map_err(|_| FsError::LockPoisoned)?;
            let inode = ns.get(ino)?;
            (inode.kind, inode.mode, inode.nlink)
        };
        let size = match kind {
            InodeKind::File => self.inner.registry.size_of(ino)? as u64,
            InodeKind::Directory => 0,
        };
        Ok(FileAttr {
            ino,
            kind,
            mode,
            nlink,
            size,
        })
    }

    /// Attach opaque data that `open` hands to every handle of `ino`.
    pub fn set_private(&self, ino: InodeId, data: PrivateData) -> FsResult<()> {
        let mut ns = self.namespace_mut()?;
        ns.get_mut(ino)?.private = Some(data);
        Ok(())
    }

    /// Open a regular file. Always succeeds for an existing file.
    pub fn open(&self, ino: InodeId) -> FsResult<FileHandle> {
        let private = {
            let ns = self.inner.namespace.read().map_err(|_| FsError::LockPoisoned)?;
            let inode = ns.get(ino)?;
            if inode.kind.is_dir() {
                return Err(FsError::IsADirectory(format!("inode {}", ino)));
            }
            inode.private.clone()
        };
        Ok(FileHandle::new(self.clone(), ino, private))
    }

    /// Read up to `count` bytes at `*pos` into `dst`, advancing `*pos`.
    pub fn read(&self, ino: InodeId, dst: &mut [u8], count: usize, pos: &mut u64) -> FsResult<usize> {
        let engine = self.inner.engine;
        self.inner
            .registry
            .find(ino, |record| engine.read(record, dst, count, pos))?
    }

    /// Replace the content of `ino` with `count` bytes of `src`.
    ///
    /// Writes always start at offset 0; a caller's cursor plays no part.
    /// Returns the new stored size.
    pub fn write(&self, ino: InodeId, src: &[u8], count: usize) -> FsResult<usize> {
        let engine = self.inner.engine;
        self.inner
            .registry
            .find_mut(ino, |record| engine.write(record, src, count))
    }

    pub fn statfs(&self) -> FsResult<StatFs> {
        let files = {
            let ns = self.inner.namespace.read().map_err(|_| FsError::LockPoisoned)?;
            ns.inode_count()
        };
        Ok(StatFs {
            magic: self.magic(),
            bsize: self.inner.capacity,
            namelen: NAME_MAX,
            files,
            file_records: self.inner.registry.len()?,
        })
    }

    /// Tear the instance down, releasing every file buffer.
    ///
    /// Other clones of this instance see an empty registry afterwards.
    pub fn unmount(self) -> FsResult<usize> {
        let released = self.inner.registry.teardown()?;
        info!(
            fs_type = %self.inner.fs_type.name,
            released,
            last_inode = self.inner.allocator.last(),
            "unmounted"
        );
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inode::ROOT_INODE;
    use crate::obfuscation::TRAILER;

    fn komafs() -> KomaFs {
        KomaFs::fill_super(&FsType::komafs(), &MountOptions::default()).unwrap()
    }

    fn islenefs() -> KomaFs {
        KomaFs::fill_super(&FsType::islenefs(), &MountOptions::for_type("islenefs")).unwrap()
    }

    #[test]
    fn test_root_attributes() {
        let fs = komafs();
        let attr = fs.getattr(ROOT_INODE).unwrap();
        assert_eq!(attr.kind, InodeKind::Directory);
        assert_eq!(attr.mode, mode::S_IFDIR | 0o755);
        assert_eq!(attr.nlink, 2);
        assert_eq!(attr.size, 0);
    }

    #[test]
    fn test_identifiers_strictly_increase() {
        let fs = komafs();
        let a = fs.create(ROOT_INODE, "a", 0o644).unwrap();
        let d = fs.mkdir(ROOT_INODE, "d", 0o755).unwrap();
        let b = fs.create(d, "b", 0o644).unwrap();
        assert!(ROOT_INODE < a && a < d && d < b);

        fs.unlink(ROOT_INODE, "a").unwrap();
        let c = fs.create(ROOT_INODE, "a", 0o644).unwrap();
        assert!(c > b);
    }

    #[test]
    fn test_create_registers_files_only() {
        let fs = komafs();
        let f = fs.create(ROOT_INODE, "f", 0o644).unwrap();
        let d = fs.mkdir(ROOT_INODE, "d", 0o755).unwrap();

        assert!(fs.registry().contains(f).unwrap());
        assert!(!fs.registry().contains(d).unwrap());
        assert_eq!(fs.registry().len().unwrap(), 1);
    }

    #[test]
    fn test_create_existing_name_fails() {
        let fs = komafs();
        fs.create(ROOT_INODE, "a", 0o644).unwrap();
        let err = fs.create(ROOT_INODE, "a", 0o644).unwrap_err();
        assert!(matches!(err, FsError::AlreadyExists(_)));
        assert_eq!(fs.registry().len().unwrap(), 1);
    }

    #[test]
    fn test_create_allocation_failure() {
        let opts = MountOptions::default().with_capacity(usize::MAX - 3);
        let fs = KomaFs::fill_super(&FsType::komafs(), &opts).unwrap();

        let err = fs.create(ROOT_INODE, "a", 0o644).unwrap_err();
        assert!(matches!(err, FsError::ResourceExhausted(_)));
        assert_eq!(err.errno(), -12);
        assert!(fs.lookup(ROOT_INODE, "a").is_err());
        assert_eq!(fs.registry().len().unwrap(), 0);

        // Directories need no buffer and still succeed
        assert!(fs.mkdir(ROOT_INODE, "d", 0o755).is_ok());
    }

    #[test]
    fn test_create_directory_through_create() {
        let fs = komafs();
        let d = fs.create(ROOT_INODE, "d", mode::S_IFDIR | 0o755).unwrap();
        let attr = fs.getattr(d).unwrap();
        assert!(attr.kind.is_dir());
        assert_eq!(attr.nlink, 2);
        // Only mkdir accounts for the parent link
        assert_eq!(fs.getattr(ROOT_INODE).unwrap().nlink, 2);
    }

    #[test]
    fn test_islenefs_create_ignores_directory_bit() {
        let fs = islenefs();
        let ino = fs.create(ROOT_INODE, "x", mode::S_IFDIR | 0o755).unwrap();
        let attr = fs.getattr(ino).unwrap();
        assert!(attr.kind.is_file());
        assert_eq!(attr.mode, mode::S_IFREG | 0o755);
        assert!(fs.registry().contains(ino).unwrap());
    }

    #[test]
    fn test_mkdir_increments_parent_links() {
        let fs = komafs();
        let before = fs.getattr(ROOT_INODE).unwrap().nlink;
        let d = fs.mkdir(ROOT_INODE, "d", 0o1777 | mode::S_IFREG).unwrap();
        fs.mkdir(ROOT_INODE, "e", 0o755).unwrap();

        assert_eq!(fs.getattr(ROOT_INODE).unwrap().nlink, before + 2);
        let attr = fs.getattr(d).unwrap();
        assert!(attr.kind.is_dir());
        assert_eq!(attr.size, 0);
        // Format bits from the caller are masked off
        assert_eq!(attr.mode, mode::S_IFDIR | 0o1777);
    }

    #[test]
    fn test_mkdir_emits_notification() {
        let fs = komafs();
        let events = fs.subscribe();
        let d = fs.mkdir(ROOT_INODE, "d", 0o755).unwrap();

        assert_eq!(
            events.try_recv().unwrap(),
            FsEvent::DirectoryCreated {
                parent: ROOT_INODE,
                name: "d".into(),
                ino: d
            }
        );
    }

    #[test]
    fn test_islenefs_has_no_directory_ops() {
        let fs = islenefs();
        assert!(matches!(
            fs.mkdir(ROOT_INODE, "d", 0o755),
            Err(FsError::Unsupported("mkdir"))
        ));
        assert!(matches!(
            fs.rmdir(ROOT_INODE, "d"),
            Err(FsError::Unsupported("rmdir"))
        ));
        assert!(matches!(
            fs.rename(ROOT_INODE, "a", ROOT_INODE, "b"),
            Err(FsError::Unsupported("rename"))
        ));
    }

    #[test]
    fn test_rmdir() {
        let fs = komafs();
        let d = fs.mkdir(ROOT_INODE, "d", 0o755).unwrap();
        fs.create(d, "f", 0o644).unwrap();

        assert!(matches!(
            fs.rmdir(ROOT_INODE, "d"),
            Err(FsError::NotEmpty(_))
        ));
        fs.unlink(d, "f").unwrap();
        fs.rmdir(ROOT_INODE, "d").unwrap();

        assert!(fs.lookup(ROOT_INODE, "d").is_err());
        assert_eq!(fs.getattr(ROOT_INODE).unwrap().nlink, 2);
    }

    #[test]
    fn test_rmdir_on_file() {
        let fs = komafs();
        fs.create(ROOT_INODE, "f", 0o644).unwrap();
        assert!(matches!(
            fs.rmdir(ROOT_INODE, "f"),
            Err(FsError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_rename_file_keeps_content() {
        let fs = komafs();
        let f = fs.create(ROOT_INODE, "a", 0o644).unwrap();
        fs.write(f, b"data", 4).unwrap();
        let d = fs.mkdir(ROOT_INODE, "d", 0o755).unwrap();

        fs.rename(ROOT_INODE, "a", d, "b").unwrap();
        assert_eq!(fs.lookup(d, "b").unwrap(), f);

        let mut out = [0u8; 4];
        let mut pos = 0;
        fs.read(f, &mut out, 4, &mut pos).unwrap();
        assert_eq!(&out, b"data");
    }

    #[test]
    fn test_rename_over_file_leaves_record() {
        let fs = komafs();
        fs.create(ROOT_INODE, "a", 0o644).unwrap();
        let b = fs.create(ROOT_INODE, "b", 0o644).unwrap();

        fs.rename(ROOT_INODE, "a", ROOT_INODE, "b").unwrap();
        assert!(fs.lookup(ROOT_INODE, "a").is_err());
        // Replaced file is unreachable but its record lives until unmount
        assert!(fs.registry().contains(b).unwrap());
        assert_eq!(fs.registry().len().unwrap(), 2);
    }

    #[test]
    fn test_rename_directory_moves_links() {
        let fs = komafs();
        let a = fs.mkdir(ROOT_INODE, "a", 0o755).unwrap();
        let b = fs.mkdir(ROOT_INODE, "b", 0o755).unwrap();
        fs.mkdir(a, "c", 0o755).unwrap();

        fs.rename(a, "c", b, "c").unwrap();
        assert_eq!(fs.getattr(a).unwrap().nlink, 2);
        assert_eq!(fs.getattr(b).unwrap().nlink, 3);
    }

    #[test]
    fn test_rename_into_own_subtree_rejected() {
        let fs = komafs();
        let a = fs.mkdir(ROOT_INODE, "a", 0o755).unwrap();
        let b = fs.mkdir(a, "b", 0o755).unwrap();
        assert!(matches!(
            fs.rename(ROOT_INODE, "a", b, "x"),
            Err(FsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_unlink_releases_record() {
        let fs = komafs();
        let f = fs.create(ROOT_INODE, "f", 0o644).unwrap();
        fs.unlink(ROOT_INODE, "f").unwrap();

        assert!(!fs.registry().contains(f).unwrap());
        let mut out = [0u8; 1];
        let mut pos = 0;
        assert!(matches!(
            fs.read(f, &mut out, 1, &mut pos),
            Err(FsError::NotFound(_))
        ));
    }

    #[test]
    fn test_unlink_directory_rejected() {
        let fs = komafs();
        fs.mkdir(ROOT_INODE, "d", 0o755).unwrap();
        assert!(matches!(
            fs.unlink(ROOT_INODE, "d"),
            Err(FsError::IsADirectory(_))
        ));
    }

    #[test]
    fn test_read_unknown_inode() {
        let fs = komafs();
        let mut out = [0u8; 4];
        let mut pos = 0;
        let err = fs.read(InodeId(99), &mut out, 4, &mut pos).unwrap_err();
        assert!(matches!(err, FsError::NotFound(InodeId(99))));
    }

    #[test]
    fn test_getattr_reports_stored_size() {
        let fs = komafs();
        let f = fs.create(ROOT_INODE, "f", 0o644).unwrap();
        fs.write(f, b"hello", 5).unwrap();
        assert_eq!(fs.getattr(f).unwrap().size, (5 + TRAILER.len()) as u64);
    }

    #[test]
    fn test_resolve_path() {
        let fs = komafs();
        let d = fs.mkdir(ROOT_INODE, "d", 0o755).unwrap();
        let f = fs.create(d, "f", 0o644).unwrap();
        assert_eq!(fs.resolve("/d/f").unwrap(), f);
        assert_eq!(fs.resolve("/").unwrap(), ROOT_INODE);
        assert!(fs.resolve("/d/missing").is_err());
    }

    #[test]
    fn test_statfs() {
        let fs = komafs();
        fs.create(ROOT_INODE, "f", 0o644).unwrap();
        fs.mkdir(ROOT_INODE, "d", 0o755).unwrap();

        let st = fs.statfs().unwrap();
        assert_eq!(st.magic, 0xAFACAB0A);
        assert_eq!(st.bsize, 4096);
        assert_eq!(st.files, 3);
        assert_eq!(st.file_records, 1);
    }

    #[test]
    fn test_options_override_type() {
        let opts = MountOptions::default().with_obfuscation(false).with_capacity(64);
        let fs = KomaFs::fill_super(&FsType::komafs(), &opts).unwrap();
        assert_eq!(fs.content_mode(), ContentMode::Plain);
        assert_eq!(fs.capacity(), 64);
        assert!(fs.fs_type().directories);
        assert_eq!(fs.max_payload(), 64);
        assert_eq!(komafs().max_payload(), 4096 - TRAILER.len());
    }

    #[test]
    fn test_options_disable_directories() {
        let opts = MountOptions::default().with_directories(false);
        let fs = KomaFs::fill_super(&FsType::komafs(), &opts).unwrap();
        assert!(!fs.fs_type().directories);
        assert_eq!(fs.content_mode(), ContentMode::Obfuscated);
        assert!(matches!(
            fs.mkdir(ROOT_INODE, "d", 0o755),
            Err(FsError::Unsupported("mkdir"))
        ));
        let f = fs.create(ROOT_INODE, "d", mode::S_IFDIR | 0o755).unwrap();
        assert!(fs.getattr(f).unwrap().kind.is_file());
    }

    #[test]
    fn test_unmount_releases_all() {
        let fs = komafs();
        fs.create(ROOT_INODE, "a", 0o644).unwrap();
        fs.create(ROOT_INODE, "b", 0o644).unwrap();
        fs.mkdir(ROOT_INODE, "d", 0o755).unwrap();

        let other = fs.clone();
        assert_eq!(fs.unmount().unwrap(), 2);
        assert!(other.registry().is_empty().unwrap());
    }
}
