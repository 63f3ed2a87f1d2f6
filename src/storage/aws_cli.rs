//! AWS CLI backed bucket access
//!
//! Lists and tags are read through the `aws s3api` command, which takes care
//! of credentials, regions and pagination.

use super::aws_cli_types::{GetObjectTaggingOutput, ListObjectsOutput};
use super::{ObjectLister, StorageError, StorageObject, TagFetcher, TagSet};
use serde::de::DeserializeOwned;
use std::io;
use std::process::{Command, Stdio};
use tracing::debug;

/// A live S3 bucket accessed through the AWS CLI
#[derive(Debug, Clone)]
pub struct AwsCliBucket {
    /// Name of the bucket
    bucket: String,
    /// Named AWS CLI profile, if not the default one
    profile: Option<String>,
}

impl AwsCliBucket {
    /// Creates a bucket handle using the default AWS CLI profile
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            profile: None,
        }
    }

    /// Uses the given AWS CLI profile for all requests
    pub fn with_profile(mut self, profile: Option<String>) -> Self {
        self.profile = profile;
        self
    }

    /// Runs an `aws s3api` subcommand and parses its JSON output
    fn call_s3api<T: DeserializeOwned>(&self, args: &[&str]) -> Result<T, StorageError> {
        let mut command = Command::new("aws");
        command.arg("s3api").args(args);
        command.arg("--bucket").arg(&self.bucket);
        command.arg("--output").arg("json");
        if let Some(profile) = &self.profile {
            command.arg("--profile").arg(profile);
        }
        debug!(?command, "Running AWS CLI");

        let output = command
            .stdin(Stdio::null())
            .output()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => StorageError::CommandFailed(
                    "AWS CLI not found. Please install it first.".to_string(),
                ),
                _ => StorageError::CommandFailed(format!("Failed to spawn aws CLI: {}", e)),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StorageError::CommandFailed(format!(
                "aws s3api {} failed with exit code {:?}: {}",
                args.first().copied().unwrap_or_default(),
                output.status.code(),
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8(output.stdout).map_err(|e| {
            StorageError::ParseError(format!("Invalid UTF-8 in aws output: {}", e))
        })?;

        // An empty listing prints nothing at all
        let stdout = if stdout.trim().is_empty() { "{}" } else { stdout.as_str() };

        serde_json::from_str(stdout)
            .map_err(|e| StorageError::ParseError(format!("Unexpected aws output: {}", e)))
    }
}

impl ObjectLister for AwsCliBucket {
    fn list_objects(&self) -> Result<Vec<StorageObject>, StorageError> {
        let listing: ListObjectsOutput = self.call_s3api(&["list-objects-v2"])?;

        Ok(listing
            .contents
            .into_iter()
            .map(|object| StorageObject {
                key: object.key,
                last_modified: object.last_modified,
            })
            .collect())
    }
}

impl TagFetcher for AwsCliBucket {
    fn fetch_tags(&self, key: &str) -> Result<TagSet, StorageError> {
        let tagging: GetObjectTaggingOutput =
            self.call_s3api(&["get-object-tagging", "--key", key])?;

        Ok(tagging
            .tag_set
            .into_iter()
            .map(|tag| (tag.key, tag.value))
            .collect())
    }
}
