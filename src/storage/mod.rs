/// Object storage collaborators of the catalog builder.
///
/// The builder never talks to a storage service itself. It consumes a listing
/// of objects and asks for the tag set of single objects through the traits
/// below, so a live bucket and a local mirror of it can be used the same way.
mod aws_cli;
mod aws_cli_types;
mod local_mirror;

pub use aws_cli::AwsCliBucket;
pub use local_mirror::LocalMirror;

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while listing objects or fetching their tags
#[derive(Debug, Error)]
pub enum StorageError {
    /// The storage command could not be run or failed
    #[error("Storage command failed: {0}")]
    CommandFailed(String),

    /// The storage command answered with something unexpected
    #[error("Failed to parse storage response: {0}")]
    ParseError(String),

    /// Failed to read the local mirror
    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The local mirror root is not a directory
    #[error("Path is not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// An object stored in the bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageObject {
    /// Slash delimited key of the object
    pub key: String,
    /// Time the object was last written
    pub last_modified: DateTime<Utc>,
}

/// Tag set of a single object
pub type TagSet = HashMap<String, String>;

/// Source of the objects to publish
pub trait ObjectLister {
    /// Lists all objects of the bucket in storage order
    fn list_objects(&self) -> Result<Vec<StorageObject>, StorageError>;
}

/// Source of per-object tags
pub trait TagFetcher {
    /// Fetches all tags of an object; objects without tags yield an empty set
    fn fetch_tags(&self, key: &str) -> Result<TagSet, StorageError>;
}

impl<T: TagFetcher + ?Sized> TagFetcher for &T {
    fn fetch_tags(&self, key: &str) -> Result<TagSet, StorageError> {
        (**self).fetch_tags(key)
    }
}

impl TagFetcher for HashMap<String, TagSet> {
    fn fetch_tags(&self, key: &str) -> Result<TagSet, StorageError> {
        Ok(self.get(key).cloned().unwrap_or_default())
    }
}
