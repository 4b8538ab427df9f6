// src/fs/mod.rs

//! Filesystem access used around a pipeline run: sizing the source for the
//! meter, checking destinations and removing the source afterwards.

use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub mod mock;

/// Abstract filesystem interface.
///
/// Implementations never follow symlinks: a link counts as a small file,
/// the same way tar archives it.
pub trait FileSystem: Send + Sync + Debug {
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;

    /// Size in bytes of a non-directory entry.
    fn file_len(&self, path: &Path) -> Result<u64>;

    /// Return a list of entries in a directory.
    /// Returns full paths.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Create a directory and any missing parents.
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Remove a file, or a directory and everything below it.
    fn remove_all(&self, path: &Path) -> Result<()>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn is_dir(&self, path: &Path) -> bool {
        fs::symlink_metadata(path)
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    fn file_len(&self, path: &Path) -> Result<u64> {
        let meta = fs::symlink_metadata(path).with_context(|| format!("stat {:?}", path))?;
        Ok(meta.len())
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).with_context(|| format!("reading dir {:?}", path))? {
            let entry = entry?;
            entries.push(entry.path());
        }
        Ok(entries)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).with_context(|| format!("creating dir {:?}", path))
    }

    fn remove_all(&self, path: &Path) -> Result<()> {
        if self.is_dir(path) {
            fs::remove_dir_all(path).with_context(|| format!("removing dir {:?}", path))
        } else {
            fs::remove_file(path).with_context(|| format!("removing file {:?}", path))
        }
    }
}

/// Total size in bytes of `path`: the file itself, or every non-directory
/// entry below a directory.
///
/// This is the byte count the meter stage is told to expect. tar adds
/// headers and padding on top, so the meter may overshoot slightly.
pub fn total_size(fs: &dyn FileSystem, path: &Path) -> Result<u64> {
    if !fs.is_dir(path) {
        return fs.file_len(path);
    }

    let mut total = 0u64;
    let mut pending = vec![path.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs.read_dir(&dir)? {
            if fs.is_dir(&entry) {
                pending.push(entry);
            } else {
                total = total.saturating_add(fs.file_len(&entry)?);
            }
        }
    }
    Ok(total)
}
