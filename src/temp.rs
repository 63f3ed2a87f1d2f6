//! Temporary file management module
//!
//! This module provides RAII-based temporary file handling with automatic cleanup.

use std::fs;
use std::io;
use std::ops::Deref;
use std::path::{Path, PathBuf};

/// Guard for a temporary file that is removed on drop unless persisted
#[derive(Debug)]
pub(crate) struct TempGuard {
    /// Path of the temporary file; `None` once it was persisted
    path: Option<PathBuf>,
}

impl TempGuard {
    /// Get the path to the temporary file
    pub(crate) fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or(Path::new(""))
    }

    /// Moves the temporary file to `destination`, replacing what is there
    ///
    /// On failure the guard stays armed and removes the file when dropped.
    pub(crate) fn persist(mut self, destination: &Path) -> io::Result<()> {
        if let Some(path) = &self.path {
            fs::rename(path, destination)?;
        }
        self.path = None;
        Ok(())
    }
}

impl Drop for TempGuard {
    fn drop(&mut self) {
        if let Some(path) = &self.path {
            // Silently ignore errors during cleanup
            let _ = fs::remove_file(path);
        }
    }
}

impl Deref for TempGuard {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        self.path()
    }
}

/// Creates an empty temporary file next to `target`
///
/// Living in the same directory as its target, the file can later replace
/// the target with an atomic rename. Its name is made unique using a ULID
/// (monotonic, sortable unique identifier). When the returned guard is
/// dropped without being persisted, the file is deleted.
pub(crate) fn create_temp_file_beside(target: &Path) -> io::Result<TempGuard> {
    let directory = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let stem = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());

    let ulid = ulid::Ulid::new();
    let path = directory.join(format!(".{}.{}.tmp", stem, ulid));

    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)?;

    Ok(TempGuard { path: Some(path) })
}
