//! roku_catalog - Build a Roku channel feed from a video bucket
//!
//! This library turns the keys of a bucket laid out as
//! `series/<series name>/<season>/<file>.<ext>` into a Roku direct publisher
//! feed: every series, season and episode found in the listing becomes an
//! entry of the feed, enriched by object tags and the naming scheme of the
//! uploaded recordings.

mod catalog;
mod config;
mod feed_builder;
mod key_parser;
mod metadata;
mod output;
mod storage;
mod temp;
mod title_deriver;

use chrono::{DateTime, Utc};

// Re-export error types
pub use config::ConfigError;
pub use feed_builder::SkipReason;
pub use key_parser::KeyParseError;
pub use output::OutputError;
pub use storage::StorageError;
pub use title_deriver::DateError;

// Re-export catalog types
pub use catalog::{
    Content, Episode, EpisodeDraft, Feed, Season, Series, SeriesDetails, Video, content_id,
};
pub use config::{CatalogConfig, default_config_path};
pub use feed_builder::{AddedEpisode, FeedBuilder, Inspection, episode_url, inspect_key};
pub use key_parser::{
    ContentKey, EpisodeKey, SERIES_CONTENT_TYPE, parse_content_key, parse_episode_key,
};
pub use metadata::{DEFAULT_DURATION_SECS, ResolvedMetadata, resolve_metadata};
pub use output::{feed_to_json, write_feed};
pub use storage::{AwsCliBucket, LocalMirror, ObjectLister, StorageObject, TagFetcher, TagSet};
pub use title_deriver::{DerivedTitle, PrefixTable, derive_title};

use thiserror::Error;

/// Progress event emitted while building a catalog
///
/// These events allow library users to report progress and per-object
/// diagnostics however they like, or to stay silent.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Catalog build started
    Started { provider_name: String },

    /// Listing the bucket contents
    ListingObjects,

    /// Bucket listing complete
    ObjectsListed { count: usize },

    /// Processing a specific object; `total` is known for listed buckets
    ProcessingObject {
        index: usize,
        total: Option<usize>,
        key: String,
    },

    /// A series was added to the feed
    SeriesCreated { title: String },

    /// A season was added to a series
    SeasonCreated { series: String, season: u32 },

    /// An episode was appended to a season
    EpisodeAdded {
        key: String,
        series: String,
        season: u32,
        episode_number: u32,
    },

    /// An object was not published
    ObjectSkipped { key: String, reason: SkipReason },

    /// Tags of an object could not be fetched; defaults are used instead
    TagFetchFailed { key: String, error: String },

    /// Catalog build complete
    Complete {
        series_count: usize,
        episode_count: usize,
        skipped_count: usize,
    },
}

/// Top-level error type for catalog operations
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Error while loading the configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error while listing the bucket
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Error while writing the feed
    #[error("Output error: {0}")]
    Output(#[from] OutputError),
}

/// Builds a feed from objects in the order they are presented
///
/// Objects that cannot be published are skipped and reported through
/// `progress_callback`; the returned feed holds everything else.
///
/// # Arguments
///
/// * `objects` - The objects to publish, consumed once
/// * `tags` - Source of the per-object tags
/// * `config` - Catalog settings
/// * `last_updated` - Timestamp written to the feed
/// * `progress_callback` - Closure called with progress events
pub fn build_feed<I, T, F>(
    objects: I,
    tags: T,
    config: &CatalogConfig,
    last_updated: DateTime<Utc>,
    mut progress_callback: F,
) -> Feed
where
    I: IntoIterator<Item = StorageObject>,
    T: TagFetcher,
    F: FnMut(ProgressEvent),
{
    let objects = objects.into_iter();
    let total = objects.size_hint().1;
    let mut builder = FeedBuilder::new(config, tags, last_updated);

    for (index, object) in objects.enumerate() {
        progress_callback(ProgressEvent::ProcessingObject {
            index,
            total,
            key: object.key.clone(),
        });

        // Skipped objects are reported by the builder itself
        let _ = builder.add_object(&object, &mut progress_callback);
    }

    let skipped_count = builder.skipped_count();
    let feed = builder.finish();

    progress_callback(ProgressEvent::Complete {
        series_count: feed.series.len(),
        episode_count: feed.episode_count(),
        skipped_count,
    });

    feed
}

/// Lists a bucket and builds its feed
///
/// # Examples
///
/// ```no_run
/// use roku_catalog::{AwsCliBucket, CatalogConfig, ProgressEvent, build_catalog, write_feed};
/// use std::path::Path;
///
/// let bucket = AwsCliBucket::new("rokufiles");
/// let config = CatalogConfig::default();
///
/// let feed = build_catalog(&bucket, &bucket, &config, chrono::Utc::now(), |event| {
///     if let ProgressEvent::ObjectSkipped { key, reason } = event {
///         eprintln!("Skipping {}: {}", key, reason);
///     }
/// })
/// .unwrap();
///
/// write_feed(&feed, Path::new("mctv-roku.json")).unwrap();
/// ```
pub fn build_catalog<L, T, F>(
    lister: &L,
    tags: T,
    config: &CatalogConfig,
    last_updated: DateTime<Utc>,
    mut progress_callback: F,
) -> Result<Feed, CatalogError>
where
    L: ObjectLister + ?Sized,
    T: TagFetcher,
    F: FnMut(ProgressEvent),
{
    progress_callback(ProgressEvent::Started {
        provider_name: config.provider_name.clone(),
    });

    progress_callback(ProgressEvent::ListingObjects);
    let objects = lister.list_objects()?;
    progress_callback(ProgressEvent::ObjectsListed {
        count: objects.len(),
    });

    Ok(build_feed(
        objects,
        tags,
        config,
        last_updated,
        progress_callback,
    ))
}
