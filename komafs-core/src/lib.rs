//! In-memory toy filesystem core.
//!
//! This crate provides everything behind a host VFS's create/open/read/write
//! entry points for two small classroom filesystems:
//! - `islenefs`: a flat filesystem storing bytes as written
//! - `komafs`: adds directories and a per-word XOR transform with a fixed trailer
//!
//! # Architecture
//!
//! - `FileRegistry`: one `FileRecord` (fixed-capacity buffer + stored size) per regular file
//! - `ReadWriteEngine`: bounded reads against a cursor, truncating writes at offset 0
//! - `obfuscation`: the reversible XOR transform
//! - `Namespace`: host-side inode table and name bindings
//! - `KomaFs`: a mounted instance wiring the above together
//! - `FsTypeRegistry`: filesystem type registration and mount
//!
//! Content never leaves memory; unmounting releases every buffer.

pub mod buffer;
pub mod engine;
pub mod error;
pub mod fs;
pub mod handle;
pub mod image;
pub mod inode;
pub mod mount;
pub mod namespace;
pub mod obfuscation;
pub mod options;
pub mod registry;

pub use buffer::{ContentBuffer, PAGE_SIZE};
pub use engine::{ContentMode, ReadWriteEngine};
pub use error::{FsError, FsResult};
pub use fs::{FsEvent, KomaFs, StatFs};
pub use handle::FileHandle;
pub use image::{load_image, load_image_from_path, ImageSummary};
pub use inode::{FileAttr, Inode, InodeId, InodeKind, ROOT_INODE};
pub use mount::{FsType, FsTypeRegistry, ISLENEFS_MAGIC, KOMAFS_MAGIC};
pub use namespace::DirEntry;
pub use obfuscation::TRAILER;
pub use options::MountOptions;
pub use registry::{FileRecord, FileRegistry};
