//! Package metadata shared across every dependency that names the package

use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// Metadata fetched from a registry for a single package
///
/// Fetched at most once per package name per run and never mutated
/// afterwards; resolutions share it through an `Arc`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageMetadata {
    /// Package name as requested from the registry
    pub name: String,
    /// All published versions, sorted by semver (lowest first, highest last)
    pub versions: Vec<String>,
    /// Dist-tags mapping (e.g. "latest" -> "4.17.21")
    pub dist_tags: HashMap<String, String>,
    /// Publish timestamps keyed by version
    pub publish_times: HashMap<String, DateTime<Utc>>,
    /// `dist.integrity` hashes keyed by version
    pub integrity: HashMap<String, String>,
}

impl PackageMetadata {
    pub fn new(name: impl Into<String>, versions: Vec<String>) -> Self {
        Self {
            name: name.into(),
            versions,
            ..Default::default()
        }
    }

    pub fn with_dist_tags(mut self, dist_tags: HashMap<String, String>) -> Self {
        self.dist_tags = dist_tags;
        self
    }

    pub fn with_publish_times(mut self, publish_times: HashMap<String, DateTime<Utc>>) -> Self {
        self.publish_times = publish_times;
        self
    }

    pub fn with_integrity(mut self, integrity: HashMap<String, String>) -> Self {
        self.integrity = integrity;
        self
    }

    /// Version the `latest` dist-tag points to, if any
    pub fn latest(&self) -> Option<&str> {
        self.dist_tag("latest")
    }

    pub fn dist_tag(&self, tag: &str) -> Option<&str> {
        self.dist_tags.get(tag).map(String::as_str)
    }

    pub fn publish_time(&self, version: &str) -> Option<DateTime<Utc>> {
        self.publish_times.get(version).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_reads_dist_tag() {
        let metadata = PackageMetadata::new("lodash", vec!["4.17.21".to_string()]).with_dist_tags(
            HashMap::from([("latest".to_string(), "4.17.21".to_string())]),
        );

        assert_eq!(metadata.latest(), Some("4.17.21"));
        assert_eq!(metadata.dist_tag("next"), None);
    }

    #[test]
    fn empty_metadata_has_no_versions() {
        let metadata = PackageMetadata::new("empty", vec![]);
        assert!(metadata.versions.is_empty());
        assert_eq!(metadata.latest(), None);
    }
}
