//! Filesystem type registration and mounting.
//!
//! Mirrors the host's `register_filesystem` / mount helper contract: a type is
//! identified by its name tag and carries a magic number for its superblocks.

use std::collections::BTreeMap;
use std::sync::RwLock;

use tracing::info;

use crate::engine::ContentMode;
use crate::error::{FsError, FsResult};
use crate::fs::KomaFs;
use crate::options::MountOptions;

pub const ISLENEFS_MAGIC: u32 = 0xBEBA_CAFE;
pub const KOMAFS_MAGIC: u32 = 0xAFAC_AB0A;

/// A registrable filesystem type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsType {
    pub name: String,
    pub magic: u32,
    /// Whether mkdir, rmdir and rename are in the directory operation table.
    pub directories: bool,
    pub content_mode: ContentMode,
}

impl FsType {
    /// Flat filesystem, content stored as written.
    pub fn islenefs() -> Self {
        Self {
            name: "islenefs".to_string(),
            magic: ISLENEFS_MAGIC,
            directories: false,
            content_mode: ContentMode::Plain,
        }
    }

    /// Directories plus XOR-obfuscated content with a trailer.
    pub fn komafs() -> Self {
        Self {
            name: "komafs".to_string(),
            magic: KOMAFS_MAGIC,
            directories: true,
            content_mode: ContentMode::Obfuscated,
        }
    }
}

/// Registered filesystem types, keyed by name.
#[derive(Debug, Default)]
pub struct FsTypeRegistry {
    types: RwLock<BTreeMap<String, FsType>>,
}

impl FsTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `islenefs` and `komafs` already registered.
    pub fn with_builtin() -> Self {
        let types = [FsType::islenefs(), FsType::komafs()]
            .into_iter()
            .map(|fs_type| (fs_type.name.clone(), fs_type))
            .collect();
        Self {
            types: RwLock::new(types),
        }
    }

    pub fn register_filesystem(&self, fs_type: FsType) -> FsResult<()> {
        let mut types = self.types.write().map_err(|_| FsError::LockPoisoned)?;
        if types.contains_key(&fs_type.name) {
            return Err(FsError::AlreadyExists(fs_type.name));
        }
        info!(name = %fs_type.name, "registered filesystem type");
        types.insert(fs_type.name.clone(), fs_type);
        Ok(())
    }

    pub fn unregister_filesystem(&self, name: &str) -> FsResult<FsType> {
        let mut types = self.types.write().map_err(|_| FsError::LockPoisoned)?;
        types
            .remove(name)
            .ok_or_else(|| FsError::UnknownFsType(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<FsType> {
        self.types.read().ok()?.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.types
            .read()
            .map(|types| types.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Mount a fresh instance of the type named in `options`.
    pub fn mount(&self, options: &MountOptions) -> FsResult<KomaFs> {
        let fs_type = self
            .get(&options.fs_type)
            .ok_or_else(|| FsError::UnknownFsType(options.fs_type.clone()))?;
        KomaFs::fill_super(&fs_type, options)
    }
}
