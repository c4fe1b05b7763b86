//! Host-side namespace: inode table and name-to-inode bindings.
//!
//! This is the part a kernel VFS would provide (dentries, simple_lookup,
//! d_instantiate). The core only asks it to bind, resolve and unbind names.

use std::collections::{BTreeMap, HashMap};

use crate::error::{FsError, FsResult};
use crate::inode::{Inode, InodeId, InodeKind, ROOT_INODE};

/// Longest name accepted in a directory.
pub const NAME_MAX: usize = 255;

/// Entry returned by `readdir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub ino: InodeId,
    pub kind: InodeKind,
}

#[derive(Debug)]
pub struct Namespace {
    inodes: HashMap<InodeId, Inode>,
    /// Children of each directory, sorted by name.
    entries: HashMap<InodeId, BTreeMap<String, InodeId>>,
    /// Parent of each directory. The root is its own parent.
    parents: HashMap<InodeId, InodeId>,
}

/// Reject names the host would never hand to a directory operation.
pub fn validate_name(name: &str) -> FsResult<()> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(FsError::InvalidArgument(format!("invalid name: {:?}", name)));
    }
    if name.contains('/') || name.contains('\0') {
        return Err(FsError::InvalidArgument(format!(
            "name contains a separator: {:?}",
            name
        )));
    }
    if name.len() > NAME_MAX {
        return Err(FsError::InvalidArgument(format!(
            "name longer than {} bytes",
            NAME_MAX
        )));
    }
    Ok(())
}

impl Namespace {
    /// Start a namespace with `root` as its only directory.
    pub fn new(root: Inode) -> Self {
        let root_id = root.id;
        let mut inodes = HashMap::new();
        inodes.insert(root_id, root);
        let mut entries = HashMap::new();
        entries.insert(root_id, BTreeMap::new());
        let mut parents = HashMap::new();
        parents.insert(root_id, root_id);
        Self {
            inodes,
            entries,
            parents,
        }
    }

    pub fn get(&self, ino: InodeId) -> FsResult<&Inode> {
        self.inodes
            .get(&ino)
            .ok_or_else(|| FsError::NoEntry(format!("inode {}", ino)))
    }

    pub fn get_mut(&mut self, ino: InodeId) -> FsResult<&mut Inode> {
        self.inodes
            .get_mut(&ino)
            .ok_or_else(|| FsError::NoEntry(format!("inode {}", ino)))
    }

    fn children(&self, dir: InodeId) -> FsResult<&BTreeMap<String, InodeId>> {
        let inode = self.get(dir)?;
        if !inode.kind.is_dir() {
            return Err(FsError::NotADirectory(format!("inode {}", dir)));
        }
        self.entries
            .get(&dir)
            .ok_or_else(|| FsError::NotADirectory(format!("inode {}", dir)))
    }

    fn children_mut(&mut self, dir: InodeId) -> FsResult<&mut BTreeMap<String, InodeId>> {
        if !self.get(dir)?.kind.is_dir() {
            return Err(FsError::NotADirectory(format!("inode {}", dir)));
        }
        self.entries
            .get_mut(&dir)
            .ok_or_else(|| FsError::NotADirectory(format!("inode {}", dir)))
    }

    /// Resolve `name` inside `parent`.
    pub fn lookup(&self, parent: InodeId, name: &str) -> FsResult<InodeId> {
        self.children(parent)?
            .get(name)
            .copied()
            .ok_or_else(|| FsError::NoEntry(name.to_string()))
    }

    /// Fail unless `name` is free inside the directory `parent`.
    pub fn check_vacant(&self, parent: InodeId, name: &str) -> FsResult<()> {
        validate_name(name)?;
        if self.children(parent)?.contains_key(name) {
            return Err(FsError::AlreadyExists(name.to_string()));
        }
        Ok(())
    }

    /// Bind a freshly built inode to `name` under `parent`.
    pub fn instantiate(&mut self, parent: InodeId, name: &str, inode: Inode) -> FsResult<()> {
        self.check_vacant(parent, name)?;
        let ino = inode.id;
        if inode.kind.is_dir() {
            self.entries.insert(ino, BTreeMap::new());
            self.parents.insert(ino, parent);
        }
        self.inodes.insert(ino, inode);
        self.children_mut(parent)?.insert(name.to_string(), ino);
        Ok(())
    }

    /// Drop the binding of `name` under `parent` and forget its inode.
    pub fn remove(&mut self, parent: InodeId, name: &str) -> FsResult<Inode> {
        let ino = self
            .children_mut(parent)?
            .remove(name)
            .ok_or_else(|| FsError::NoEntry(name.to_string()))?;
        self.entries.remove(&ino);
        self.parents.remove(&ino);
        self.inodes
            .remove(&ino)
            .ok_or_else(|| FsError::NoEntry(name.to_string()))
    }

    /// Move a binding. The destination name must be vacant.
    pub fn relink(
        &mut self,
        old_parent: InodeId,
        old_name: &str,
        new_parent: InodeId,
        new_name: &str,
    ) -> FsResult<()> {
        self.check_vacant(new_parent, new_name)?;
        let ino = self
            .children_mut(old_parent)?
            .remove(old_name)
            .ok_or_else(|| FsError::NoEntry(old_name.to_string()))?;
        self.children_mut(new_parent)?
            .insert(new_name.to_string(), ino);
        if self.entries.contains_key(&ino) {
            self.parents.insert(ino, new_parent);
        }
        Ok(())
    }

    /// Whether `dir` has no entries.
    pub fn is_empty_dir(&self, dir: InodeId) -> FsResult<bool> {
        Ok(self.children(dir)?.is_empty())
    }

    /// Whether `ino` is `ancestor` or lives somewhere beneath it.
    pub fn is_within(&self, ino: InodeId, ancestor: InodeId) -> bool {
        let mut current = ino;
        loop {
            if current == ancestor {
                return true;
            }
            match self.parents.get(&current) {
                Some(&parent) if parent != current => current = parent,
                _ => return false,
            }
        }
    }

    pub fn readdir(&self, dir: InodeId) -> FsResult<Vec<DirEntry>> {
        self.children(dir)?
            .iter()
            .map(|(name, &ino)| {
                Ok(DirEntry {
                    name: name.clone(),
                    ino,
                    kind: self.get(ino)?.kind,
                })
            })
            .collect()
    }

    pub fn inode_count(&self) -> usize {
        self.inodes.len()
    }

    pub fn root(&self) -> InodeId {
        ROOT_INODE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inode::mode::S_IFDIR;

    fn namespace() -> Namespace {
        Namespace::new(Inode::new(ROOT_INODE, S_IFDIR | 0o755))
    }

    #[test]
    fn test_instantiate_and_lookup() {
        let mut ns = namespace();
        ns.instantiate(ROOT_INODE, "a", Inode::new(InodeId(2), 0o644))
            .unwrap();

        assert_eq!(ns.lookup(ROOT_INODE, "a").unwrap(), InodeId(2));
        assert!(matches!(
            ns.lookup(ROOT_INODE, "b"),
            Err(FsError::NoEntry(_))
        ));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut ns = namespace();
        ns.instantiate(ROOT_INODE, "a", Inode::new(InodeId(2), 0o644))
            .unwrap();
        let err = ns
            .instantiate(ROOT_INODE, "a", Inode::new(InodeId(3), 0o644))
            .unwrap_err();
        assert!(matches!(err, FsError::AlreadyExists(_)));
    }

    #[test]
    fn test_lookup_in_file_is_not_a_directory() {
        let mut ns = namespace();
        ns.instantiate(ROOT_INODE, "a", Inode::new(InodeId(2), 0o644))
            .unwrap();
        assert!(matches!(
            ns.lookup(InodeId(2), "x"),
            Err(FsError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("file.txt").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name(&"x".repeat(NAME_MAX + 1)).is_err());
    }

    #[test]
    fn test_readdir_sorted() {
        let mut ns = namespace();
        ns.instantiate(ROOT_INODE, "b", Inode::new(InodeId(2), 0o644))
            .unwrap();
        ns.instantiate(ROOT_INODE, "a", Inode::new(InodeId(3), S_IFDIR | 0o755))
            .unwrap();

        let names: Vec<_> = ns
            .readdir(ROOT_INODE)
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_is_within() {
        let mut ns = namespace();
        ns.instantiate(ROOT_INODE, "d", Inode::new(InodeId(2), S_IFDIR | 0o755))
            .unwrap();
        ns.instantiate(InodeId(2), "e", Inode::new(InodeId(3), S_IFDIR | 0o755))
            .unwrap();

        assert!(ns.is_within(InodeId(3), InodeId(2)));
        assert!(ns.is_within(InodeId(3), ROOT_INODE));
        assert!(!ns.is_within(InodeId(2), InodeId(3)));
    }

    #[test]
    fn test_relink_moves_entry() {
        let mut ns = namespace();
        ns.instantiate(ROOT_INODE, "d", Inode::new(InodeId(2), S_IFDIR | 0o755))
            .unwrap();
        ns.instantiate(ROOT_INODE, "f", Inode::new(InodeId(3), 0o644))
            .unwrap();

        ns.relink(ROOT_INODE, "f", InodeId(2), "g").unwrap();
        assert!(ns.lookup(ROOT_INODE, "f").is_err());
        assert_eq!(ns.lookup(InodeId(2), "g").unwrap(), InodeId(3));
    }
}
