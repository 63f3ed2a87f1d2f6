//! Local bucket mirror
//!
//! A directory laid out like the bucket (e.g. the result of `aws s3 sync`)
//! can stand in for the live bucket. Tags are read from an optional sidecar
//! file next to each object, `<object>.tags.json`, holding a JSON object of
//! string values.

use super::{ObjectLister, StorageError, StorageObject, TagFetcher, TagSet};
use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Suffix of tag sidecar files
const TAGS_SUFFIX: &str = ".tags.json";

/// A local directory mirroring the bucket contents
#[derive(Debug, Clone)]
pub struct LocalMirror {
    /// Directory corresponding to the bucket root
    root: PathBuf,
}

impl LocalMirror {
    /// Creates a mirror rooted at the given directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the tag sidecar belonging to a key
    fn tags_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}{}", key, TAGS_SUFFIX))
    }

    /// Recursively collects all objects below `dir_path`
    fn scan_directory_recursive(
        &self,
        dir_path: &Path,
        objects: &mut Vec<StorageObject>,
    ) -> Result<(), StorageError> {
        let read_failed = |source: io::Error| StorageError::ReadFailed {
            path: dir_path.to_path_buf(),
            source,
        };

        for entry in fs::read_dir(dir_path).map_err(read_failed)? {
            let path = entry.map_err(read_failed)?.path();

            if path.is_dir() {
                self.scan_directory_recursive(&path, objects)?;
            } else if path.is_file() {
                let Some(key) = self.key_for(&path) else {
                    warn!(path = %path.display(), "Skipping file without UTF-8 key");
                    continue;
                };
                if key.ends_with(TAGS_SUFFIX) {
                    continue;
                }

                let last_modified = fs::metadata(&path)
                    .and_then(|metadata| metadata.modified())
                    .map(DateTime::<Utc>::from)
                    .map_err(|source| StorageError::ReadFailed {
                        path: path.clone(),
                        source,
                    })?;

                objects.push(StorageObject { key, last_modified });
            }
        }

        Ok(())
    }

    /// Converts a file path below the root into a slash delimited key
    fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let segments = relative
            .components()
            .map(|component| component.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()?;

        Some(segments.join("/"))
    }
}

impl ObjectLister for LocalMirror {
    /// Lists all files in key order, like a bucket listing
    fn list_objects(&self) -> Result<Vec<StorageObject>, StorageError> {
        if !self.root.is_dir() {
            return Err(StorageError::NotADirectory(self.root.clone()));
        }

        let mut objects = Vec::new();
        self.scan_directory_recursive(&self.root, &mut objects)?;
        objects.sort_by(|a, b| a.key.cmp(&b.key));

        Ok(objects)
    }
}

impl TagFetcher for LocalMirror {
    fn fetch_tags(&self, key: &str) -> Result<TagSet, StorageError> {
        let path = self.tags_path(key);

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(TagSet::new()),
            Err(source) => return Err(StorageError::ReadFailed { path, source }),
        };

        serde_json::from_str(&content).map_err(|e| {
            StorageError::ParseError(format!("Invalid tag file {}: {}", path.display(), e))
        })
    }
}
