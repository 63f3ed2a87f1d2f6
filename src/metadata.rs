//! Episode metadata resolution
//!
//! Object tags are an optional channel for metadata the file name cannot
//! carry. Every field has a fallback chain ending in a value derived from the
//! file name or a configured default, so missing or malformed tags never stop
//! an episode from being published.

use crate::title_deriver::{DerivedTitle, PrefixTable};
use std::collections::HashMap;

/// Tag holding the running time in seconds
pub const DURATION_TAG: &str = "duration";
/// Tag holding the short description
pub const SHORT_DESCRIPTION_TAG: &str = "shortDescription";
/// Tag holding the long description
pub const LONG_DESCRIPTION_TAG: &str = "longDescription";

/// Running time used when no usable duration tag exists (three hours)
pub const DEFAULT_DURATION_SECS: u64 = 10800;

/// Final metadata of one episode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMetadata {
    pub duration: u64,
    pub short_description: String,
    pub long_description: String,
    pub thumbnail: String,
}

/// Resolves episode metadata from object tags and derived values
///
/// Precedence per field:
/// - duration: `duration` tag, then `default_duration`; a tag of zero
///   seconds counts as malformed
/// - short description: `shortDescription` tag, then the derived title
/// - long description: `longDescription` tag, then the short description
/// - thumbnail: prefix table entry (tags are not consulted)
pub fn resolve_metadata(
    tags: &HashMap<String, String>,
    derived: &DerivedTitle,
    default_duration: u64,
    thumbnails: &PrefixTable,
) -> ResolvedMetadata {
    let duration = tag_value(tags, DURATION_TAG)
        .and_then(parse_duration)
        .unwrap_or(default_duration);

    let short_description = tag_value(tags, SHORT_DESCRIPTION_TAG)
        .map(str::to_string)
        .unwrap_or_else(|| derived.title.clone());

    let long_description = tag_value(tags, LONG_DESCRIPTION_TAG)
        .map(str::to_string)
        .unwrap_or_else(|| short_description.clone());

    ResolvedMetadata {
        duration,
        short_description,
        long_description,
        thumbnail: thumbnails.lookup(derived.prefix.as_deref()).to_string(),
    }
}

/// Returns a tag's trimmed value, treating blank values as absent
fn tag_value<'t>(tags: &'t HashMap<String, String>, name: &str) -> Option<&'t str> {
    tags.get(name)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

/// Parses a positive number of seconds
fn parse_duration(value: &str) -> Option<u64> {
    value.parse::<u64>().ok().filter(|secs| *secs > 0)
}
