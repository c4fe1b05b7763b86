//! Seed a mounted instance from a ZIP image.
//!
//! Directory entries become mkdir calls and file entries become create + write,
//! so every file goes through the same capacity and transform rules as a
//! regular write. Nothing is ever written back to the image.

use std::io::{Read, Seek};
use std::path::Path;

use tracing::debug;
use zip::ZipArchive;

use crate::error::{FsError, FsResult};
use crate::fs::KomaFs;
use crate::inode::InodeId;

/// What an image load put into the filesystem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageSummary {
    pub files: usize,
    pub directories: usize,
    pub bytes: usize,
}

/// Find or create the directory `name` under `parent`.
fn ensure_dir(
    fs: &KomaFs,
    parent: InodeId,
    name: &str,
    summary: &mut ImageSummary,
) -> FsResult<InodeId> {
    match fs.lookup(parent, name) {
        Ok(ino) if fs.getattr(ino)?.kind.is_dir() => Ok(ino),
        Ok(_) => Err(FsError::NotADirectory(name.to_string())),
        Err(FsError::NoEntry(_)) => {
            let ino = fs.mkdir(parent, name, 0o755)?;
            summary.directories += 1;
            Ok(ino)
        }
        Err(e) => Err(e),
    }
}

fn ensure_path(fs: &KomaFs, dirs: &[&str], summary: &mut ImageSummary) -> FsResult<InodeId> {
    dirs.iter()
        .try_fold(fs.root(), |parent, name| ensure_dir(fs, parent, name, summary))
}

fn too_large(path: &str, len: u64, limit: usize) -> FsError {
    FsError::ResourceExhausted(format!(
        "image entry {} holds {} bytes, at most {} fit",
        path, len, limit
    ))
}

/// Load every entry of a ZIP archive into `fs`.
pub fn load_image<R: Read + Seek>(fs: &KomaFs, reader: R) -> FsResult<ImageSummary> {
    let mut archive = ZipArchive::new(reader)?;
    let mut summary = ImageSummary::default();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let path = entry.name().to_string();
        let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        let Some((name, dirs)) = components.split_last() else {
            continue;
        };

        let parent = ensure_path(fs, dirs, &mut summary)?;
        if entry.is_dir() {
            ensure_dir(fs, parent, name, &mut summary)?;
            continue;
        }

        let ino = match fs.lookup(parent, name) {
            Ok(ino) if fs.getattr(ino)?.kind.is_dir() => {
                return Err(FsError::IsADirectory(path.clone()));
            }
            Ok(ino) => Some(ino),
            Err(FsError::NoEntry(_)) => None,
            Err(e) => return Err(e),
        };

        // Reject before inflating; the take() bound covers a lying size header.
        let limit = fs.max_payload();
        if entry.size() > limit as u64 {
            return Err(too_large(&path, entry.size(), limit));
        }
        let mut content = Vec::with_capacity(entry.size() as usize);
        entry.by_ref().take(limit as u64 + 1).read_to_end(&mut content)?;
        if content.len() > limit {
            return Err(too_large(&path, content.len() as u64, limit));
        }

        let ino = match ino {
            Some(ino) => ino,
            None => {
                let perm = entry.unix_mode().map(|m| m & 0o7777).unwrap_or(0o644);
                fs.create(parent, name, perm)?
            }
        };
        fs.write(ino, &content, content.len())?;
        debug!(path = %path, %ino, len = content.len(), "loaded image entry");

        summary.files += 1;
        summary.bytes += content.len();
    }

    Ok(summary)
}

/// Load an image from a file path.
pub fn load_image_from_path(fs: &KomaFs, path: &Path) -> FsResult<ImageSummary> {
    let file = std::fs::File::open(path)?;
    load_image(fs, std::io::BufReader::new(file))
}
