//! Mount options.
//!
//! Options are plain JSON so they can live next to an image:
//!
//! ```json
//! { "fsType": "komafs", "capacity": 4096, "obfuscate": false }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::buffer::PAGE_SIZE;
use crate::error::{FsError, FsResult};

fn default_fs_type() -> String {
    "komafs".to_string()
}

fn default_capacity() -> usize {
    PAGE_SIZE
}

/// Options for one mount. Unset feature flags fall back to the filesystem type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountOptions {
    #[serde(default = "default_fs_type")]
    pub fs_type: String,
    /// Bytes per file buffer.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default)]
    pub directories: Option<bool>,
    #[serde(default)]
    pub obfuscate: Option<bool>,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            fs_type: default_fs_type(),
            capacity: default_capacity(),
            directories: None,
            obfuscate: None,
        }
    }
}

impl MountOptions {
    /// Options for `fs_type` with everything else at its default.
    pub fn for_type(fs_type: impl Into<String>) -> Self {
        Self {
            fs_type: fs_type.into(),
            ..Self::default()
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_directories(mut self, enabled: bool) -> Self {
        self.directories = Some(enabled);
        self
    }

    pub fn with_obfuscation(mut self, enabled: bool) -> Self {
        self.obfuscate = Some(enabled);
        self
    }

    pub fn from_json(text: &str) -> FsResult<Self> {
        let options: Self = serde_json::from_str(text)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_path(path: &Path) -> FsResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Capacity must hold whole 32-bit words so the XOR transform never runs past it.
    pub fn validate(&self) -> FsResult<()> {
        if self.capacity == 0 || self.capacity % 4 != 0 {
            return Err(FsError::InvalidArgument(format!(
                "capacity must be a non-zero multiple of 4, got {}",
                self.capacity
            )));
        }
        Ok(())
    }
}
