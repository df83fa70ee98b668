//! npm registry API implementation

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use semver::Version;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::FETCH_TIMEOUT_MS;
use crate::version::error::RegistryError;
use crate::version::registry::Registry;
use crate::version::types::PackageMetadata;

/// Default base URL for npm registry
pub const DEFAULT_BASE_URL: &str = "https://registry.npmjs.org";

/// npm-compatible endpoint serving JSR packages under the `@jsr` scope
pub const JSR_NPM_BASE_URL: &str = "https://npm.jsr.io";

/// Response from npm registry API
#[derive(Debug, Deserialize)]
struct NpmPackageResponse {
    #[serde(default)]
    versions: HashMap<String, NpmVersionInfo>,
    #[serde(default, rename = "dist-tags")]
    dist_tags: HashMap<String, String>,
    #[serde(default)]
    time: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct NpmVersionInfo {
    #[serde(default)]
    dist: Option<NpmDist>,
}

#[derive(Debug, Deserialize)]
struct NpmDist {
    integrity: Option<String>,
}

/// Registry implementation for npm registry API
#[derive(Clone)]
pub struct NpmRegistry {
    client: reqwest::Client,
    base_url: String,
    /// Per-scope registry overrides (e.g. "@jsr" -> npm.jsr.io)
    scoped: HashMap<String, String>,
}

impl NpmRegistry {
    /// Creates a new NpmRegistry with a custom base URL
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(concat!("depbump/", env!("CARGO_PKG_VERSION")))
                .timeout(Duration::from_millis(FETCH_TIMEOUT_MS))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            scoped: HashMap::from([("@jsr".to_string(), JSR_NPM_BASE_URL.to_string())]),
        }
    }

    /// Route a scope to a different registry
    pub fn with_scope(mut self, scope: &str, base_url: &str) -> Self {
        self.scoped.insert(
            scope.to_string(),
            base_url.trim_end_matches('/').to_string(),
        );
        self
    }

    /// Encode package name for URL (handles scoped packages)
    fn encode_package_name(package_name: &str) -> String {
        if package_name.starts_with('@') {
            // Scoped package: @scope/name -> @scope%2Fname
            package_name.replace('/', "%2F")
        } else {
            package_name.to_string()
        }
    }

    fn base_url_for(&self, package_name: &str) -> &str {
        package_name
            .split_once('/')
            .and_then(|(scope, _)| self.scoped.get(scope))
            .map(String::as_str)
            .unwrap_or(&self.base_url)
    }
}

impl Default for NpmRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[async_trait::async_trait]
impl Registry for NpmRegistry {
    async fn fetch_metadata(&self, package_name: &str) -> Result<PackageMetadata, RegistryError> {
        let encoded_name = Self::encode_package_name(package_name);
        let url = format!("{}/{}", self.base_url_for(package_name), encoded_name);
        debug!("Fetching npm metadata: {}", url);

        let response = self.client.get(&url).send().await?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(package_name.to_string()));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(RegistryError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            warn!("npm registry returned status {}: {}", status, url);
            return Err(RegistryError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        let package_info: NpmPackageResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse npm registry response: {}", e);
            RegistryError::InvalidResponse(e.to_string())
        })?;

        Ok(into_metadata(package_name, package_info))
    }
}

fn into_metadata(package_name: &str, response: NpmPackageResponse) -> PackageMetadata {
    let integrity: HashMap<String, String> = response
        .versions
        .iter()
        .filter_map(|(v, info)| {
            let hash = info.dist.as_ref()?.integrity.clone()?;
            Some((v.clone(), hash))
        })
        .collect();

    // Sort versions by semver (lowest first, highest last)
    let mut versions: Vec<(String, Version)> = response
        .versions
        .into_keys()
        .filter_map(|v| Version::parse(&v).ok().map(|parsed| (v, parsed)))
        .collect();

    versions.sort_by(|(_, a), (_, b)| a.cmp(b));

    let versions: Vec<String> = versions.into_iter().map(|(v, _)| v).collect();

    // `time` also carries "created" and "modified"; keep only version entries
    let published: HashSet<&str> = versions.iter().map(String::as_str).collect();
    let publish_times: HashMap<String, DateTime<Utc>> = response
        .time
        .into_iter()
        .filter(|(v, _)| published.contains(v.as_str()))
        .filter_map(|(v, ts)| {
            DateTime::parse_from_rfc3339(&ts)
                .ok()
                .map(|dt| (v, dt.with_timezone(&Utc)))
        })
        .collect();

    PackageMetadata::new(package_name, versions)
        .with_dist_tags(response.dist_tags)
        .with_publish_times(publish_times)
        .with_integrity(integrity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn fetch_metadata_returns_versions_sorted_by_semver() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/lodash")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "name": "lodash",
                    "dist-tags": { "latest": "4.17.21" },
                    "versions": {
                        "4.17.21": { "dist": { "integrity": "sha512-abc" } },
                        "4.17.19": {},
                        "4.17.20": {}
                    },
                    "time": {
                        "created": "2012-04-23T16:37:11.912Z",
                        "modified": "2023-01-01T00:00:00.000Z",
                        "4.17.21": "2021-02-20T15:42:16.891Z"
                    }
                }"#,
            )
            .create_async()
            .await;

        let registry = NpmRegistry::new(&server.url());
        let result = registry.fetch_metadata("lodash").await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            result.versions,
            vec![
                "4.17.19".to_string(),
                "4.17.20".to_string(),
                "4.17.21".to_string()
            ]
        );
        assert_eq!(result.latest(), Some("4.17.21"));
        assert_eq!(
            result.integrity.get("4.17.21").map(String::as_str),
            Some("sha512-abc")
        );
        assert_eq!(result.publish_times.len(), 1);
        assert_eq!(
            result.publish_time("4.17.21").map(|t| t.to_rfc3339()),
            Some("2021-02-20T15:42:16.891+00:00".to_string())
        );
    }

    #[tokio::test]
    async fn fetch_metadata_returns_not_found_for_nonexistent_package() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/nonexistent-package")
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "Not found"}"#)
            .create_async()
            .await;

        let registry = NpmRegistry::new(&server.url());
        let result = registry.fetch_metadata("nonexistent-package").await;

        mock.assert_async().await;
        assert!(matches!(result, Err(RegistryError::NotFound(_))));
    }

    #[tokio::test]
    async fn fetch_metadata_reports_rate_limiting() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/busy")
            .with_status(429)
            .with_header("retry-after", "30")
            .create_async()
            .await;

        let registry = NpmRegistry::new(&server.url());
        let result = registry.fetch_metadata("busy").await;

        mock.assert_async().await;
        assert!(matches!(
            result,
            Err(RegistryError::RateLimited {
                retry_after_secs: Some(30)
            })
        ));
    }

    #[tokio::test]
    async fn fetch_metadata_handles_scoped_package() {
        let mut server = Server::new_async().await;

        // Scoped packages use URL encoding: @types/node -> @types%2Fnode
        let mock = server
            .mock("GET", "/@types%2Fnode")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "name": "@types/node",
                    "versions": {
                        "20.0.0": {},
                        "18.0.0": {}
                    }
                }"#,
            )
            .create_async()
            .await;

        let registry = NpmRegistry::new(&server.url());
        let result = registry.fetch_metadata("@types/node").await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            result.versions,
            vec!["18.0.0".to_string(), "20.0.0".to_string()]
        );
        assert!(result.dist_tags.is_empty());
    }

    #[tokio::test]
    async fn fetch_metadata_routes_scope_to_its_registry() {
        let mut default_server = Server::new_async().await;
        let mut scoped_server = Server::new_async().await;

        let default_mock = default_server
            .mock("GET", "/@jsr%2Fstd__path")
            .expect(0)
            .create_async()
            .await;
        let scoped_mock = scoped_server
            .mock("GET", "/@jsr%2Fstd__path")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"versions": {"1.0.0": {}}}"#)
            .create_async()
            .await;

        let registry =
            NpmRegistry::new(&default_server.url()).with_scope("@jsr", &scoped_server.url());
        let result = registry.fetch_metadata("@jsr/std__path").await.unwrap();

        default_mock.assert_async().await;
        scoped_mock.assert_async().await;
        assert_eq!(result.versions, vec!["1.0.0".to_string()]);
    }

    #[tokio::test]
    async fn fetch_metadata_returns_empty_for_package_without_versions() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/empty-package")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "name": "empty-package",
                    "versions": {}
                }"#,
            )
            .create_async()
            .await;

        let registry = NpmRegistry::new(&server.url());
        let result = registry.fetch_metadata("empty-package").await.unwrap();

        mock.assert_async().await;
        assert!(result.versions.is_empty());
    }
}
