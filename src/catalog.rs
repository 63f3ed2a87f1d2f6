//! Catalog tree of the generated feed
//!
//! The feed owns its series, every series owns its seasons and every season
//! owns its episodes. Nodes are only ever appended: series are unique by
//! title, seasons unique by number within their series, and episodes are
//! numbered 1..N within their season in the order they were appended.
//!
//! Field order of the structures below is the field order of the JSON feed.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Computes the stable identifier used for series and episodes
///
/// The identifier is the hex encoded SHA256 digest of the given text, so the
/// same title or file name yields the same id on every run.
pub fn content_id(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

/// The complete feed document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
    pub provider_name: String,
    pub last_updated: DateTime<Utc>,
    pub language: String,
    pub movies: Vec<serde_json::Value>,
    pub short_form_videos: Vec<serde_json::Value>,
    pub tv_specials: Vec<serde_json::Value>,
    pub series: Vec<Series>,
    pub categories: Vec<serde_json::Value>,
    pub playlists: Vec<serde_json::Value>,
}

impl Feed {
    /// Creates an empty feed
    pub fn new(
        provider_name: impl Into<String>,
        language: impl Into<String>,
        last_updated: DateTime<Utc>,
    ) -> Self {
        Self {
            provider_name: provider_name.into(),
            last_updated,
            language: language.into(),
            movies: Vec::new(),
            short_form_videos: Vec::new(),
            tv_specials: Vec::new(),
            series: Vec::new(),
            categories: Vec::new(),
            playlists: Vec::new(),
        }
    }

    /// Looks up a series by title
    pub fn find_series(&self, title: &str) -> Option<&Series> {
        self.series.iter().find(|series| series.title == title)
    }

    /// Returns the series with the given title, appending one built by
    /// `create` if the feed has none yet
    ///
    /// The flag is true if the series was created by this call.
    pub fn find_or_create_series<F>(&mut self, title: &str, create: F) -> (&mut Series, bool)
    where
        F: FnOnce() -> Series,
    {
        match self.series.iter().position(|series| series.title == title) {
            Some(index) => (&mut self.series[index], false),
            None => {
                let series = create();
                debug_assert_eq!(series.title, title);
                self.series.push(series);
                let index = self.series.len() - 1;
                (&mut self.series[index], true)
            }
        }
    }

    /// Number of episodes over all series and seasons
    pub fn episode_count(&self) -> usize {
        self.series
            .iter()
            .flat_map(|series| &series.seasons)
            .map(|season| season.episodes.len())
            .sum()
    }
}

/// Descriptive fields of a series besides its title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesDetails {
    pub tags: Vec<String>,
    pub release_date: NaiveDate,
    pub genres: Vec<String>,
    pub thumbnail: String,
    pub short_description: String,
    pub long_description: String,
}

/// A series with its seasons
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub id: String,
    pub title: String,
    pub tags: Vec<String>,
    pub release_date: NaiveDate,
    pub genres: Vec<String>,
    pub thumbnail: String,
    pub short_description: String,
    pub long_description: String,
    pub seasons: Vec<Season>,
}

impl Series {
    /// Creates a series without seasons, identified by its title
    pub fn new(title: impl Into<String>, details: SeriesDetails) -> Self {
        let title = title.into();
        Self {
            id: content_id(&title),
            title,
            tags: details.tags,
            release_date: details.release_date,
            genres: details.genres,
            thumbnail: details.thumbnail,
            short_description: details.short_description,
            long_description: details.long_description,
            seasons: Vec::new(),
        }
    }

    /// Looks up a season by number
    pub fn find_season(&self, season_number: u32) -> Option<&Season> {
        self.seasons
            .iter()
            .find(|season| season.season_number == season_number)
    }

    /// Returns the season with the given number, appending an empty one if
    /// the series has none yet
    ///
    /// The flag is true if the season was created by this call.
    pub fn find_or_create_season(&mut self, season_number: u32) -> (&mut Season, bool) {
        match self
            .seasons
            .iter()
            .position(|season| season.season_number == season_number)
        {
            Some(index) => (&mut self.seasons[index], false),
            None => {
                self.seasons.push(Season::new(season_number));
                let index = self.seasons.len() - 1;
                (&mut self.seasons[index], true)
            }
        }
    }
}

/// A season and its episodes in discovery order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Season {
    pub season_number: u32,
    pub episodes: Vec<Episode>,
}

impl Season {
    /// Creates an empty season
    pub fn new(season_number: u32) -> Self {
        Self {
            season_number,
            episodes: Vec::new(),
        }
    }

    /// Appends an episode, numbering it after the current last episode
    pub fn append_episode(&mut self, draft: EpisodeDraft) -> &Episode {
        let episode_number = self
            .episodes
            .last()
            .map(|last| last.episode_number + 1)
            .unwrap_or(1);

        self.episodes.push(Episode {
            id: draft.id,
            title: draft.title,
            content: draft.content,
            thumbnail: draft.thumbnail,
            episode_number,
            short_description: draft.short_description,
            long_description: draft.long_description,
            release_date: draft.release_date,
        });

        &self.episodes[self.episodes.len() - 1]
    }
}

/// An episode before it has been numbered within its season
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeDraft {
    pub id: String,
    pub title: String,
    pub content: Content,
    pub thumbnail: String,
    pub short_description: String,
    pub long_description: String,
    pub release_date: NaiveDate,
}

/// A numbered episode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub id: String,
    pub title: String,
    pub content: Content,
    pub thumbnail: String,
    pub episode_number: u32,
    pub short_description: String,
    pub long_description: String,
    pub release_date: NaiveDate,
}

/// Playable content of an episode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    pub date_added: DateTime<Utc>,
    pub videos: Vec<Video>,
    /// Running time in seconds
    pub duration: u64,
}

/// A single rendition of a video
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub url: String,
    pub quality: String,
    pub video_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn details() -> SeriesDetails {
        SeriesDetails {
            tags: vec!["video".to_string()],
            release_date: NaiveDate::from_ymd_opt(2011, 8, 1).unwrap(),
            genres: vec!["news".to_string()],
            thumbnail: "thumb.png".to_string(),
            short_description: "Meetings".to_string(),
            long_description: "Meetings".to_string(),
        }
    }

    fn draft(name: &str) -> EpisodeDraft {
        EpisodeDraft {
            id: content_id(name),
            title: name.to_string(),
            content: Content {
                date_added: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
                videos: Vec::new(),
                duration: 60,
            },
            thumbnail: "thumb.png".to_string(),
            short_description: name.to_string(),
            long_description: name.to_string(),
            release_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    fn feed() -> Feed {
        Feed::new("Provider", "en", Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())
    }

    #[test]
    fn test_content_id_is_sha256_hex() {
        assert_eq!(
            content_id("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_find_or_create_series_is_idempotent() {
        let mut feed = feed();
        let (series, created) = feed
            .find_or_create_series("Council Meetings", || Series::new("Council Meetings", details()));
        assert!(created);
        let first_id = series.id.clone();

        let mut created_again = false;
        let (series, created) = feed.find_or_create_series("Council Meetings", || {
            created_again = true;
            Series::new("Council Meetings", details())
        });
        assert!(!created);
        let second_id = series.id.clone();

        assert!(!created_again);
        assert_eq!(first_id, second_id);
        assert_eq!(feed.series.len(), 1);

        feed.find_or_create_series("Planning Commission", || {
            Series::new("Planning Commission", details())
        });
        let titles: Vec<_> = feed.series.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["Council Meetings", "Planning Commission"]);
        assert!(feed.find_series("Planning Commission").is_some());
        assert!(feed.find_series("Parade").is_none());
    }

    #[test]
    fn test_find_or_create_season_keeps_first_seen_order() {
        let mut series = Series::new("Council Meetings", details());
        assert!(series.find_or_create_season(2024).1);
        assert!(series.find_or_create_season(2023).1);
        assert!(!series.find_or_create_season(2024).1);

        let numbers: Vec<_> = series.seasons.iter().map(|s| s.season_number).collect();
        assert_eq!(numbers, [2024, 2023]);
        assert!(series.find_season(2023).is_some());
        assert!(series.find_season(2022).is_none());
    }

    #[test]
    fn test_append_episode_numbers_in_discovery_order() {
        let mut season = Season::new(2024);
        // Release dates play no part in numbering
        for name in ["MCC240301", "MCC240101", "MCC240201"] {
            season.append_episode(draft(name));
        }

        let numbers: Vec<_> = season.episodes.iter().map(|e| e.episode_number).collect();
        assert_eq!(numbers, [1, 2, 3]);
        assert_eq!(season.episodes[0].title, "MCC240301");
    }

    #[test]
    fn test_append_episode_returns_numbered_episode() {
        let mut season = Season::new(1);
        assert_eq!(season.append_episode(draft("a")).episode_number, 1);
        assert_eq!(season.append_episode(draft("b")).episode_number, 2);
    }

    #[test]
    fn test_feed_serializes_in_fixed_field_order() {
        let mut feed = feed();
        let (series, _) = feed
            .find_or_create_series("Council Meetings", || Series::new("Council Meetings", details()));
        let (season, _) = series.find_or_create_season(2024);
        season.append_episode(draft("MCC240101"));

        let json = serde_json::to_string(&feed).unwrap();
        let keys = [
            "\"providerName\"",
            "\"lastUpdated\"",
            "\"language\"",
            "\"movies\"",
            "\"shortFormVideos\"",
            "\"tvSpecials\"",
            "\"series\"",
            "\"categories\"",
            "\"playlists\"",
        ];
        let positions: Vec<_> = keys.iter().map(|k| json.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["lastUpdated"], "2024-01-02T03:04:05Z");
        assert_eq!(value["series"][0]["releaseDate"], "2011-08-01");
        let episode = &value["series"][0]["seasons"][0]["episodes"][0];
        assert_eq!(episode["episodeNumber"], 1);
        assert_eq!(episode["content"]["dateAdded"], "2024-01-02T03:04:05Z");
        assert_eq!(episode["releaseDate"], "2024-01-01");
        assert_eq!(feed.episode_count(), 1);
    }
}
