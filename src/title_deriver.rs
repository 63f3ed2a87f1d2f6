//! Episode title and release date derivation
//!
//! Recordings are uploaded with a code prefix followed by their recording date,
//! e.g. `MCC250815` for the council meeting of August 15th, 2025. Viewers want
//! to see the date, so the formatted date becomes the episode title while the
//! prefix selects thumbnails and display names from lookup tables.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Key of the fallback entry every prefix table carries
pub const DEFAULT_PREFIX_KEY: &str = "default";

/// Display format of derived titles, e.g. `Aug 15, 2025`
const TITLE_DATE_FORMAT: &str = "%b %d, %Y";

/// Non-digit prefix followed by exactly six digits (YYMMDD)
static DATED_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<prefix>[^0-9]+)(?P<date>[0-9]{6})$").expect("valid dated name regex")
});

/// Error for file names whose embedded date is not a calendar date
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    #[error("File name {filename} embeds {digits}, which is not a valid YYMMDD date")]
    InvalidDate { filename: String, digits: String },
}

/// Title, release date and prefix derived from an episode file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedTitle {
    /// Human readable title
    pub title: String,
    /// Date the episode was recorded, or the fallback date
    pub release_date: NaiveDate,
    /// Code prefix, if the file name followed the dated naming scheme
    pub prefix: Option<String>,
}

/// Lookup table keyed by file name prefix with a `default` fallback entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct PrefixTable(BTreeMap<String, String>);

impl PrefixTable {
    /// Creates a table holding only the fallback entry
    pub fn new(default: impl Into<String>) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(DEFAULT_PREFIX_KEY.to_string(), default.into());
        Self(entries)
    }

    /// Adds or replaces the entry for a prefix
    pub fn with_entry(mut self, prefix: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(prefix.into(), value.into());
        self
    }

    /// Returns true if the table carries its fallback entry
    pub fn has_default(&self) -> bool {
        self.0.contains_key(DEFAULT_PREFIX_KEY)
    }

    /// Looks up a prefix, falling back to the `default` entry
    pub fn lookup(&self, prefix: Option<&str>) -> &str {
        prefix
            .and_then(|p| self.0.get(p))
            .or_else(|| self.0.get(DEFAULT_PREFIX_KEY))
            .map(String::as_str)
            .unwrap_or_default()
    }
}

/// Derives title and release date from a file name without extension
///
/// Names not following the `<prefix><YYMMDD>` scheme keep their name as title
/// and get `fallback_date` as release date. Names following the scheme but
/// embedding an impossible date are rejected instead of guessing.
pub fn derive_title(filename: &str, fallback_date: NaiveDate) -> Result<DerivedTitle, DateError> {
    let Some(captures) = DATED_NAME_RE.captures(filename) else {
        return Ok(DerivedTitle {
            title: filename.to_string(),
            release_date: fallback_date,
            prefix: None,
        });
    };

    let digits = &captures["date"];
    let release_date = parse_short_date(digits).ok_or_else(|| DateError::InvalidDate {
        filename: filename.to_string(),
        digits: digits.to_string(),
    })?;

    Ok(DerivedTitle {
        title: release_date.format(TITLE_DATE_FORMAT).to_string(),
        release_date,
        prefix: Some(captures["prefix"].to_string()),
    })
}

/// Parses six ASCII digits as YYMMDD in the 21st century
fn parse_short_date(digits: &str) -> Option<NaiveDate> {
    let year: i32 = digits.get(0..2)?.parse().ok()?;
    let month: u32 = digits.get(2..4)?.parse().ok()?;
    let day: u32 = digits.get(4..6)?.parse().ok()?;

    NaiveDate::from_ymd_opt(2000 + year, month, day)
}
