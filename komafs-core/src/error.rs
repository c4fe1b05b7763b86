//! Error types for the in-memory filesystem.

use thiserror::Error;

use crate::inode::InodeId;

/// Errors returned to the host framework.
#[derive(Error, Debug)]
pub enum FsError {
    #[error("No file record for inode {0}")]
    NotFound(InodeId),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Faulty buffer: need {needed} bytes, caller supplied {supplied}")]
    FaultyBuffer { needed: usize, supplied: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No such entry: {0}")]
    NoEntry(String),

    #[error("File exists: {0}")]
    AlreadyExists(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Is a directory: {0}")]
    IsADirectory(String),

    #[error("Directory not empty: {0}")]
    NotEmpty(String),

    #[error("Operation not supported by this filesystem type: {0}")]
    Unsupported(&'static str),

    #[error("Unknown filesystem type: {0}")]
    UnknownFsType(String),

    #[error("Lock poisoned")]
    LockPoisoned,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for filesystem operations.
pub type FsResult<T> = Result<T, FsError>;

/// Linux errno values handed back to the host.
pub mod errno {
    pub const EPERM: i32 = 1;
    pub const ENOENT: i32 = 2;
    pub const EIO: i32 = 5;
    pub const ENOMEM: i32 = 12;
    pub const EFAULT: i32 = 14;
    pub const EEXIST: i32 = 17;
    pub const ENODEV: i32 = 19;
    pub const ENOTDIR: i32 = 20;
    pub const EISDIR: i32 = 21;
    pub const EINVAL: i32 = 22;
    pub const ENOTEMPTY: i32 = 39;
}

impl FsError {
    /// Negative result code as the host's file operation table expects it.
    pub fn errno(&self) -> i32 {
        let code = match self {
            FsError::NotFound(_) | FsError::NoEntry(_) => errno::ENOENT,
            FsError::ResourceExhausted(_) => errno::ENOMEM,
            FsError::FaultyBuffer { .. } => errno::EFAULT,
            FsError::InvalidArgument(_) => errno::EINVAL,
            FsError::AlreadyExists(_) => errno::EEXIST,
            FsError::NotADirectory(_) => errno::ENOTDIR,
            FsError::IsADirectory(_) => errno::EISDIR,
            FsError::NotEmpty(_) => errno::ENOTEMPTY,
            FsError::Unsupported(_) => errno::EPERM,
            FsError::UnknownFsType(_) => errno::ENODEV,
            FsError::LockPoisoned
            | FsError::Io(_)
            | FsError::Zip(_)
            | FsError::Json(_) => errno::EIO,
        };
        -code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_is_negative() {
        assert_eq!(FsError::NotFound(InodeId(3)).errno(), -errno::ENOENT);
        assert_eq!(
            FsError::ResourceExhausted("buffer".into()).errno(),
            -errno::ENOMEM
        );
        assert_eq!(
            FsError::FaultyBuffer {
                needed: 4,
                supplied: 2
            }
            .errno(),
            -errno::EFAULT
        );
        assert_eq!(FsError::Unsupported("mkdir").errno(), -errno::EPERM);
    }

    #[test]
    fn test_display_includes_inode() {
        let msg = FsError::NotFound(InodeId(42)).to_string();
        assert!(msg.contains("42"));
    }
}
