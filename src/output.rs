//! Feed output
//!
//! The feed is written as JSON indented by four spaces. It first goes to a
//! temporary file beside the destination which then replaces the destination,
//! so readers never see a half written feed.

use crate::catalog::Feed;
use crate::temp::create_temp_file_beside;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Indentation of the written JSON
const JSON_INDENT: &[u8] = b"    ";

/// Errors that can occur while writing the feed
#[derive(Debug, Error)]
pub enum OutputError {
    /// Failed to serialize the feed
    #[error("Failed to serialize feed: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    /// The serialized feed is not valid UTF-8
    #[error("Serialized feed is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// Failed to create the temporary file
    #[error("Failed to create temporary file for {path}: {source}")]
    TempFileFailed { path: PathBuf, source: io::Error },

    /// Failed to write the feed
    #[error("Failed to write feed to {path}: {source}")]
    WriteFailed { path: PathBuf, source: io::Error },

    /// Failed to move the feed into place
    #[error("Failed to replace {path}: {source}")]
    ReplaceFailed { path: PathBuf, source: io::Error },
}

/// Serializes the feed as JSON indented by four spaces
pub fn feed_to_json(feed: &Feed) -> Result<String, OutputError> {
    let mut buffer = Vec::new();
    let mut serializer =
        Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(JSON_INDENT));
    feed.serialize(&mut serializer)?;

    Ok(String::from_utf8(buffer)?)
}

/// Writes the feed to `path`, replacing any previous feed there
pub fn write_feed(feed: &Feed, path: &Path) -> Result<(), OutputError> {
    let json = feed_to_json(feed)?;

    let temp = create_temp_file_beside(path).map_err(|e| OutputError::TempFileFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    fs::write(&*temp, json).map_err(|e| OutputError::WriteFailed {
        path: temp.to_path_buf(),
        source: e,
    })?;

    temp.persist(path).map_err(|e| OutputError::ReplaceFailed {
        path: path.to_path_buf(),
        source: e,
    })
}
