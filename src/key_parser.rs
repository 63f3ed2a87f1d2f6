//! Storage key parser
//!
//! Bucket keys follow the layout `<content type>/<name>/<season>/<file>.<ext>`,
//! e.g. `series/Council Meetings/2024/MCC240101.mp4`. Parsing happens in two
//! steps: the content part (type and name) is matched first, the episode part
//! (season and file) only afterwards, so a series can be known even when one of
//! its objects does not describe a playable episode.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

/// Content type that is turned into series/season/episode entries
pub const SERIES_CONTENT_TYPE: &str = "series";

/// Content type at the start of the key, followed by the content name
static CONTENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<type>\w+)/(?P<name>[\w ]+)").expect("valid content regex")
});

/// Full episode layout; the file part is anchored to the end of the key and
/// split on its last dot. Folders below the season stay part of the file name.
static EPISODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<type>\w+)/(?P<name>[\w ]+)/(?P<season>\d+)/(?P<filename>.+)\.(?P<ext>\w+)$")
        .expect("valid episode regex")
});

/// Errors that can occur while parsing a storage key
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyParseError {
    /// The key does not start with `<type>/<name>`
    #[error("Key does not match <type>/<name>: {0}")]
    NoContentMatch(String),

    /// The key does not continue with `<season>/<file>.<ext>`
    #[error("Key does not match <type>/<name>/<season>/<file>.<ext>: {0}")]
    NoEpisodeMatch(String),
}

/// Content type and name extracted from the first two key segments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentKey {
    /// First segment, e.g. `series`
    pub content_type: String,
    /// Second segment, e.g. `Council Meetings`
    pub name: String,
}

impl ContentKey {
    /// Returns true if this key belongs to the series hierarchy
    pub fn is_series(&self) -> bool {
        self.content_type == SERIES_CONTENT_TYPE
    }
}

/// All segments of a key describing a single episode file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeKey {
    /// First segment, e.g. `series`
    pub content_type: String,
    /// Second segment, e.g. `Council Meetings`
    pub name: String,
    /// Third segment as written in the key, e.g. `2024`
    pub season_segment: String,
    /// Third segment as a number
    pub season: u32,
    /// File name without extension, e.g. `MCC240101`; may contain the
    /// folders between season and file, e.g. `raw/part1`
    pub filename: String,
    /// File extension without the dot, e.g. `mp4`
    pub extension: String,
}

impl EpisodeKey {
    /// File name including its extension, e.g. `MCC240101.mp4`
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.filename, self.extension)
    }

    /// The key segments joined back together, as used in delivery URLs
    pub fn object_path(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.content_type,
            self.name,
            self.season_segment,
            self.file_name()
        )
    }
}

/// Extracts content type and name from the beginning of a key
///
/// Anything following the name is ignored, so nested folders below a
/// series still yield its content key.
pub fn parse_content_key(key: &str) -> Result<ContentKey, KeyParseError> {
    let captures = CONTENT_RE
        .captures(key)
        .ok_or_else(|| KeyParseError::NoContentMatch(key.to_string()))?;

    let content = ContentKey {
        content_type: captures["type"].to_string(),
        name: captures["name"].to_string(),
    };
    debug!(
        key,
        content_type = %content.content_type,
        name = %content.name,
        "Matched content key"
    );

    Ok(content)
}

/// Extracts all episode segments from a key
pub fn parse_episode_key(key: &str) -> Result<EpisodeKey, KeyParseError> {
    let captures = EPISODE_RE
        .captures(key)
        .ok_or_else(|| KeyParseError::NoEpisodeMatch(key.to_string()))?;

    let season_segment = captures["season"].to_string();
    // A digit run too long for u32 cannot be a season number
    let season = season_segment
        .parse::<u32>()
        .map_err(|_| KeyParseError::NoEpisodeMatch(key.to_string()))?;

    let episode = EpisodeKey {
        content_type: captures["type"].to_string(),
        name: captures["name"].to_string(),
        season_segment,
        season,
        filename: captures["filename"].to_string(),
        extension: captures["ext"].to_string(),
    };
    debug!(key, season, filename = %episode.filename, "Matched episode key");

    Ok(episode)
}
