/// AWS CLI response types for deserialization.
///
/// These structures mirror the JSON printed by `aws s3api list-objects-v2`
/// and `aws s3api get-object-tagging`.
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Output of `list-objects-v2`; `Contents` is absent for an empty bucket
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct ListObjectsOutput {
    #[serde(default)]
    pub contents: Vec<ListedObject>,
}

/// A single entry of `Contents`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct ListedObject {
    pub key: String,
    pub last_modified: DateTime<Utc>,
}

/// Output of `get-object-tagging`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct GetObjectTaggingOutput {
    #[serde(default)]
    pub tag_set: Vec<Tag>,
}

/// A single entry of `TagSet`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct Tag {
    pub key: String,
    pub value: String,
}
