//! Catalog configuration
//!
//! Everything that differs between channels (provider name, CDN, defaults and
//! the prefix tables) lives in a TOML file. Every field is optional; missing
//! fields take the built-in values of the Millbrae Community Television feed.

use crate::metadata::DEFAULT_DURATION_SECS;
use crate::title_deriver::PrefixTable;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file inside the platform config directory
const CONFIG_FILE_NAME: &str = "config.toml";

/// 16x9 placeholder used when no thumbnail is known for a prefix
const PLACEHOLDER_THUMBNAIL: &str = "https://upload.wikimedia.org/wikipedia/commons/thumb/f/f8/Aspect-ratio-16x9.svg/2000px-Aspect-ratio-16x9.svg.png";

/// Errors that can occur while loading the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read config file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse the configuration file
    #[error("Failed to parse config file {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A prefix table lacks its `default` entry
    #[error("Table [{0}] must contain a \"default\" entry")]
    MissingDefault(&'static str),
}

/// Settings of a catalog run
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Name of the channel provider shown in the feed
    pub provider_name: String,
    /// Language code of the feed
    pub language: String,
    /// Public delivery URL prefix of the bucket
    pub cdn_base: String,
    /// Release date used when none can be derived
    pub fallback_release_date: NaiveDate,
    /// Running time in seconds used when no duration tag exists
    pub default_duration: u64,
    /// Tags attached to every series
    pub series_tags: Vec<String>,
    /// Genres attached to every series
    pub series_genres: Vec<String>,
    /// Episode thumbnails by file name prefix
    pub thumbnails: PrefixTable,
    /// Series display titles by file name prefix
    pub series_titles: PrefixTable,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        let provider_name = "Millbrae Community Television".to_string();
        Self {
            language: "en".to_string(),
            cdn_base: "http://d3mgvwaiuadt8i.cloudfront.net".to_string(),
            fallback_release_date: NaiveDate::from_ymd_opt(2011, 8, 1)
                .unwrap_or(NaiveDate::MIN),
            default_duration: DEFAULT_DURATION_SECS,
            series_tags: vec!["video".to_string(), "educational".to_string()],
            series_genres: vec!["educational".to_string(), "news".to_string()],
            thumbnails: PrefixTable::new(PLACEHOLDER_THUMBNAIL),
            series_titles: PrefixTable::new(provider_name.clone())
                .with_entry("MCC", "Millbrae City Council Meetings"),
            provider_name,
        }
    }
}

impl CatalogConfig {
    /// Parses a configuration from TOML text
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content, path)
    }

    /// Loads the explicit configuration file if given, else the one in the
    /// platform config directory if it exists, else the built-in defaults
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        match default_config_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.thumbnails.has_default() {
            return Err(ConfigError::MissingDefault("thumbnails"));
        }
        if !self.series_titles.has_default() {
            return Err(ConfigError::MissingDefault("series_titles"));
        }
        Ok(())
    }
}

/// Location of the configuration file in the platform config directory
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("tv", "millbrae", "roku-catalog")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}
