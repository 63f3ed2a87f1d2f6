//! Feed builder
//!
//! Turns storage objects into catalog entries one at a time. Each object is
//! parsed, its series and season are looked up or created, its metadata is
//! resolved and the resulting episode is appended. Objects that cannot be
//! published are skipped and reported; they never abort the run.

use crate::ProgressEvent;
use crate::catalog::{Content, EpisodeDraft, Feed, Series, SeriesDetails, Video, content_id};
use crate::config::CatalogConfig;
use crate::key_parser::{EpisodeKey, KeyParseError, parse_content_key, parse_episode_key};
use crate::metadata::{ResolvedMetadata, resolve_metadata};
use crate::storage::{StorageObject, TagFetcher, TagSet};
use crate::title_deriver::{DateError, DerivedTitle, derive_title};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

/// Quality announced for every video rendition
const VIDEO_QUALITY: &str = "FHD";

/// Reasons for not publishing an object
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    /// The key does not follow the bucket layout
    #[error(transparent)]
    ParseMismatch(#[from] KeyParseError),

    /// The file name embeds an impossible date
    #[error(transparent)]
    InvalidDate(#[from] DateError),

    /// Only series are published
    #[error("Content type {0:?} is not published")]
    UnsupportedContentType(String),
}

/// Position of a freshly appended episode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedEpisode {
    pub series: String,
    pub season: u32,
    pub episode_number: u32,
}

/// Builds a feed from storage objects presented in listing order
///
/// Episode numbers follow the order in which objects are added, so objects
/// must be added in the order the listing presented them.
pub struct FeedBuilder<'c, T: TagFetcher> {
    config: &'c CatalogConfig,
    tags: T,
    feed: Feed,
    skipped: usize,
}

impl<'c, T: TagFetcher> FeedBuilder<'c, T> {
    /// Creates a builder for an empty feed stamped with `last_updated`
    pub fn new(config: &'c CatalogConfig, tags: T, last_updated: DateTime<Utc>) -> Self {
        Self {
            config,
            tags,
            feed: Feed::new(&config.provider_name, &config.language, last_updated),
            skipped: 0,
        }
    }

    /// The feed built so far
    pub fn feed(&self) -> &Feed {
        &self.feed
    }

    /// Number of objects skipped so far
    pub fn skipped_count(&self) -> usize {
        self.skipped
    }

    /// Finishes the build and hands out the feed
    pub fn finish(self) -> Feed {
        self.feed
    }

    /// Adds a single object to the feed
    ///
    /// The series of an object is created as soon as its key names one, even
    /// if the rest of the key turns out not to describe an episode.
    pub fn add_object<F>(
        &mut self,
        object: &StorageObject,
        progress: &mut F,
    ) -> Result<AddedEpisode, SkipReason>
    where
        F: FnMut(ProgressEvent),
    {
        let result = self.try_add_object(object, progress);
        if let Err(reason) = &result {
            self.skipped += 1;
            progress(ProgressEvent::ObjectSkipped {
                key: object.key.clone(),
                reason: reason.clone(),
            });
        }
        result
    }

    fn try_add_object<F>(
        &mut self,
        object: &StorageObject,
        progress: &mut F,
    ) -> Result<AddedEpisode, SkipReason>
    where
        F: FnMut(ProgressEvent),
    {
        let config = self.config;

        let content = parse_content_key(&object.key)?;
        if !content.is_series() {
            return Err(SkipReason::UnsupportedContentType(content.content_type));
        }

        let parsed = parse_episode_key(&object.key).map(|episode| {
            let derived = derive_title(&episode.filename, config.fallback_release_date);
            (episode, derived)
        });
        let prefix = parsed
            .as_ref()
            .ok()
            .and_then(|(_, derived)| derived.as_ref().ok())
            .and_then(|derived| derived.prefix.clone());

        let (series, series_created) = self.feed.find_or_create_series(&content.name, || {
            new_series(config, &content.name, prefix.as_deref())
        });
        if series_created {
            progress(ProgressEvent::SeriesCreated {
                title: content.name.clone(),
            });
        }

        let (episode_key, derived) = parsed?;
        let derived = derived?;

        let tags = fetch_tags(&self.tags, &object.key, progress);
        let metadata = resolve_metadata(
            &tags,
            &derived,
            config.default_duration,
            &config.thumbnails,
        );
        let draft = episode_draft(config, object, &episode_key, &derived, metadata);

        let (season, season_created) = series.find_or_create_season(episode_key.season);
        if season_created {
            progress(ProgressEvent::SeasonCreated {
                series: content.name.clone(),
                season: episode_key.season,
            });
        }
        let episode = season.append_episode(draft);

        let added = AddedEpisode {
            series: content.name,
            season: episode_key.season,
            episode_number: episode.episode_number,
        };
        debug!(key = %object.key, ?added, "Appended episode");
        progress(ProgressEvent::EpisodeAdded {
            key: object.key.clone(),
            series: added.series.clone(),
            season: added.season,
            episode_number: added.episode_number,
        });

        Ok(added)
    }
}

/// Fetches the tags of an object, degrading to no tags on failure
fn fetch_tags<T, F>(tags: &T, key: &str, progress: &mut F) -> TagSet
where
    T: TagFetcher,
    F: FnMut(ProgressEvent),
{
    match tags.fetch_tags(key) {
        Ok(tags) => tags,
        Err(e) => {
            progress(ProgressEvent::TagFetchFailed {
                key: key.to_string(),
                error: e.to_string(),
            });
            TagSet::new()
        }
    }
}

/// Everything known about a single key, as shown by `inspect`
#[derive(Debug, Clone, PartialEq)]
pub struct Inspection {
    pub key: String,
    pub episode_key: Result<EpisodeKey, SkipReason>,
    pub derived: Option<Result<DerivedTitle, DateError>>,
    pub tags: Option<TagSet>,
    /// Why the tags could not be fetched; metadata then uses the defaults
    pub tag_error: Option<String>,
    pub metadata: Option<ResolvedMetadata>,
    pub url: Option<String>,
}

/// Runs the parsing and resolution steps for one key without building a feed
pub fn inspect_key<T: TagFetcher>(key: &str, tags: &T, config: &CatalogConfig) -> Inspection {
    let episode_key = parse_content_key(key)
        .map_err(SkipReason::from)
        .and_then(|content| {
            if content.is_series() {
                parse_episode_key(key).map_err(SkipReason::from)
            } else {
                Err(SkipReason::UnsupportedContentType(content.content_type))
            }
        });

    let mut inspection = Inspection {
        key: key.to_string(),
        episode_key,
        derived: None,
        tags: None,
        tag_error: None,
        metadata: None,
        url: None,
    };

    let Ok(episode) = &inspection.episode_key else {
        return inspection;
    };
    inspection.url = Some(episode_url(&config.cdn_base, episode));

    let derived = derive_title(&episode.filename, config.fallback_release_date);
    if let Ok(derived) = &derived {
        let tag_set = match tags.fetch_tags(key) {
            Ok(tag_set) => tag_set,
            Err(e) => {
                inspection.tag_error = Some(e.to_string());
                TagSet::new()
            }
        };
        inspection.metadata = Some(resolve_metadata(
            &tag_set,
            derived,
            config.default_duration,
            &config.thumbnails,
        ));
        inspection.tags = Some(tag_set);
    }
    inspection.derived = Some(derived);

    inspection
}

/// Builds the public URL of an episode file
///
/// The whole object path, slashes included, is percent-encoded and appended
/// to the CDN base as a single segment.
pub fn episode_url(cdn_base: &str, episode: &EpisodeKey) -> String {
    format!(
        "{}/{}",
        cdn_base.trim_end_matches('/'),
        urlencoding::encode(&episode.object_path())
    )
}

/// Creates a series carrying the configured defaults
fn new_series(config: &CatalogConfig, title: &str, prefix: Option<&str>) -> Series {
    let display = match prefix {
        Some(prefix) => config.series_titles.lookup(Some(prefix)),
        None => title,
    };
    let description = format!("Video collection of {}", display);

    Series::new(
        title,
        SeriesDetails {
            tags: config.series_tags.clone(),
            release_date: config.fallback_release_date,
            genres: config.series_genres.clone(),
            thumbnail: config.thumbnails.lookup(None).to_string(),
            short_description: description.clone(),
            long_description: description,
        },
    )
}

fn episode_draft(
    config: &CatalogConfig,
    object: &StorageObject,
    episode: &EpisodeKey,
    derived: &DerivedTitle,
    metadata: ResolvedMetadata,
) -> EpisodeDraft {
    EpisodeDraft {
        id: content_id(&episode.file_name()),
        title: derived.title.clone(),
        content: Content {
            date_added: object.last_modified,
            videos: vec![Video {
                url: episode_url(&config.cdn_base, episode),
                quality: VIDEO_QUALITY.to_string(),
                video_type: episode.extension.to_uppercase(),
            }],
            duration: metadata.duration,
        },
        thumbnail: metadata.thumbnail,
        short_description: metadata.short_description,
        long_description: metadata.long_description,
        release_date: derived.release_date,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;
    use chrono::TimeZone;
    use std::cell::RefCell;
    use std::collections::HashMap;

    fn object(key: &str) -> StorageObject {
        StorageObject {
            key: key.to_string(),
            last_modified: Utc.with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    /// Tag fetcher recording every key it was asked for
    #[derive(Default)]
    struct RecordingTags {
        tags: HashMap<String, TagSet>,
        requests: RefCell<Vec<String>>,
    }

    impl TagFetcher for RecordingTags {
        fn fetch_tags(&self, key: &str) -> Result<TagSet, StorageError> {
            self.requests.borrow_mut().push(key.to_string());
            self.tags.fetch_tags(key)
        }
    }

    struct FailingTags;

    impl TagFetcher for FailingTags {
        fn fetch_tags(&self, _key: &str) -> Result<TagSet, StorageError> {
            Err(StorageError::CommandFailed("connection reset".to_string()))
        }
    }

    #[test]
    fn test_add_object_builds_episode() {
        let config = CatalogConfig::default();
        let mut builder = FeedBuilder::new(&config, RecordingTags::default(), now());
        let mut events = Vec::new();

        let added = builder
            .add_object(
                &object("series/Council Meetings/2024/MCC240101.mp4"),
                &mut |e| events.push(e),
            )
            .unwrap();
        assert_eq!(
            added,
            AddedEpisode {
                series: "Council Meetings".to_string(),
                season: 2024,
                episode_number: 1,
            }
        );

        let series = &builder.feed().series[0];
        assert_eq!(series.id, content_id("Council Meetings"));
        assert_eq!(
            series.short_description,
            "Video collection of Millbrae City Council Meetings"
        );

        let episode = &series.seasons[0].episodes[0];
        assert_eq!(episode.id, content_id("MCC240101.mp4"));
        assert_eq!(episode.title, "Jan 01, 2024");
        assert_eq!(episode.release_date.to_string(), "2024-01-01");
        assert_eq!(episode.short_description, "Jan 01, 2024");
        assert_eq!(episode.content.duration, 10800);
        assert_eq!(episode.content.date_added, object("x").last_modified);
        assert_eq!(
            episode.content.videos[0].url,
            "http://d3mgvwaiuadt8i.cloudfront.net/series%2FCouncil%20Meetings%2F2024%2FMCC240101.mp4"
        );
        assert_eq!(episode.content.videos[0].quality, "FHD");
        assert_eq!(episode.content.videos[0].video_type, "MP4");

        assert!(matches!(events[0], ProgressEvent::SeriesCreated { .. }));
        assert!(matches!(events[1], ProgressEvent::SeasonCreated { season: 2024, .. }));
        assert!(matches!(
            events[2],
            ProgressEvent::EpisodeAdded { episode_number: 1, .. }
        ));
    }

    #[test]
    fn test_series_persists_when_episode_does_not_match() {
        let config = CatalogConfig::default();
        let tags = RecordingTags::default();
        let mut builder = FeedBuilder::new(&config, &tags, now());

        let result = builder.add_object(&object("series/Parade/"), &mut |_| {});
        assert!(matches!(
            result,
            Err(SkipReason::ParseMismatch(KeyParseError::NoEpisodeMatch(_)))
        ));

        let feed = builder.finish();
        assert_eq!(feed.series.len(), 1);
        assert_eq!(feed.series[0].title, "Parade");
        assert_eq!(feed.series[0].short_description, "Video collection of Parade");
        assert!(feed.series[0].seasons.is_empty());
        assert!(tags.requests.borrow().is_empty());
    }

    #[test]
    fn test_invalid_date_skips_object() {
        let config = CatalogConfig::default();
        let mut builder = FeedBuilder::new(&config, RecordingTags::default(), now());
        let mut skipped = Vec::new();

        let result = builder.add_object(
            &object("series/Council Meetings/2024/MCC241332.mp4"),
            &mut |e| {
                if let ProgressEvent::ObjectSkipped { key, .. } = e {
                    skipped.push(key);
                }
            },
        );

        assert!(matches!(result, Err(SkipReason::InvalidDate(_))));
        assert_eq!(skipped, ["series/Council Meetings/2024/MCC241332.mp4"]);
        assert_eq!(builder.skipped_count(), 1);
        assert_eq!(builder.feed().episode_count(), 0);
    }

    #[test]
    fn test_other_content_types_are_skipped() {
        let config = CatalogConfig::default();
        let mut builder = FeedBuilder::new(&config, RecordingTags::default(), now());

        let result = builder.add_object(&object("movies/Founders Day/1/fd.mp4"), &mut |_| {});
        assert_eq!(
            result,
            Err(SkipReason::UnsupportedContentType("movies".to_string()))
        );
        assert!(builder.feed().series.is_empty());
        assert!(builder.feed().movies.is_empty());
    }

    #[test]
    fn test_tags_are_fetched_once_per_episode() {
        let config = CatalogConfig::default();
        let mut tags = RecordingTags::default();
        tags.tags.insert(
            "series/Council Meetings/2024/MCC240101.mp4".to_string(),
            TagSet::from([
                ("duration".to_string(), "5400".to_string()),
                ("longDescription".to_string(), "Budget session".to_string()),
            ]),
        );
        let mut builder = FeedBuilder::new(&config, &tags, now());

        builder
            .add_object(
                &object("series/Council Meetings/2024/MCC240101.mp4"),
                &mut |_| {},
            )
            .unwrap();

        assert_eq!(tags.requests.borrow().len(), 1);
        let episode = &builder.feed().series[0].seasons[0].episodes[0];
        assert_eq!(episode.content.duration, 5400);
        assert_eq!(episode.short_description, "Jan 01, 2024");
        assert_eq!(episode.long_description, "Budget session");
    }

    #[test]
    fn test_tag_failure_degrades_to_defaults() {
        let config = CatalogConfig::default();
        let mut builder = FeedBuilder::new(&config, FailingTags, now());
        let mut failures = 0;

        builder
            .add_object(
                &object("series/Council Meetings/2024/MCC240101.mp4"),
                &mut |e| {
                    if let ProgressEvent::TagFetchFailed { .. } = e {
                        failures += 1;
                    }
                },
            )
            .unwrap();

        assert_eq!(failures, 1);
        let episode = &builder.feed().series[0].seasons[0].episodes[0];
        assert_eq!(episode.content.duration, config.default_duration);
    }

    #[test]
    fn test_undated_file_uses_fallback_release_date() {
        let config = CatalogConfig::default();
        let mut builder = FeedBuilder::new(&config, RecordingTags::default(), now());

        builder
            .add_object(&object("series/Parade/2019/Main Street.mov"), &mut |_| {})
            .unwrap();

        let episode = &builder.feed().series[0].seasons[0].episodes[0];
        assert_eq!(episode.title, "Main Street");
        assert_eq!(episode.release_date, config.fallback_release_date);
        assert_eq!(episode.content.videos[0].video_type, "MOV");
        assert_eq!(
            episode.content.videos[0].url,
            "http://d3mgvwaiuadt8i.cloudfront.net/series%2FParade%2F2019%2FMain%20Street.mov"
        );
    }

    #[test]
    fn test_inspect_key() {
        let config = CatalogConfig::default();
        let tags: HashMap<String, TagSet> = HashMap::new();

        let inspection = inspect_key("series/Council Meetings/2024/MCC240101.mp4", &tags, &config);
        assert!(inspection.episode_key.is_ok());
        assert_eq!(
            inspection.derived.unwrap().unwrap().title,
            "Jan 01, 2024"
        );
        assert_eq!(inspection.metadata.unwrap().duration, 10800);
        assert!(inspection.url.unwrap().ends_with("MCC240101.mp4"));

        let inspection = inspect_key("randomfile.txt", &tags, &config);
        assert!(matches!(
            inspection.episode_key,
            Err(SkipReason::ParseMismatch(KeyParseError::NoContentMatch(_)))
        ));
        assert!(inspection.derived.is_none());
    }

    #[test]
    fn test_inspect_key_reports_tag_failure() {
        let config = CatalogConfig::default();

        let inspection = inspect_key(
            "series/Council Meetings/2024/MCC240101.mp4",
            &FailingTags,
            &config,
        );
        assert_eq!(
            inspection.tag_error.as_deref(),
            Some("Storage command failed: connection reset")
        );
        assert_eq!(inspection.tags, Some(TagSet::new()));
        assert_eq!(inspection.metadata.unwrap().duration, 10800);
    }

    #[test]
    fn test_nested_key_becomes_episode() {
        let config = CatalogConfig::default();
        let tags = RecordingTags::default();
        let mut builder = FeedBuilder::new(&config, &tags, now());

        let added = builder
            .add_object(&object("series/A/1/raw/part1.mp4"), &mut |_| {})
            .unwrap();
        assert_eq!(added.episode_number, 1);
        assert_eq!(*tags.requests.borrow(), ["series/A/1/raw/part1.mp4"]);

        let episode = &builder.feed().series[0].seasons[0].episodes[0];
        assert_eq!(episode.title, "raw/part1");
        assert_eq!(episode.id, content_id("raw/part1.mp4"));
        assert_eq!(
            episode.content.videos[0].url,
            "http://d3mgvwaiuadt8i.cloudfront.net/series%2FA%2F1%2Fraw%2Fpart1.mp4"
        );
    }

    #[test]
    fn test_series_created_event_is_emitted_once() {
        let config = CatalogConfig::default();
        let mut builder = FeedBuilder::new(&config, RecordingTags::default(), now());
        let mut created = Vec::new();

        for key in [
            "series/Council Meetings/2024/MCC240101.mp4",
            "series/Council Meetings/2023/MCC231201.mp4",
            "series/Council Meetings/2024/MCC240201.mp4",
        ] {
            builder
                .add_object(&object(key), &mut |e| match e {
                    ProgressEvent::SeriesCreated { title } => created.push(title),
                    ProgressEvent::SeasonCreated { season, .. } => {
                        created.push(season.to_string())
                    }
                    _ => {}
                })
                .unwrap();
        }

        assert_eq!(created, ["Council Meetings", "2024", "2023"]);
    }
}
