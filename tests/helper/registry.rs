//! Registry test utilities

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use depbump::resolve::{DependencyResolver, ResolveOptions};
use depbump::version::cache::{Cache, MetadataStore};
use depbump::version::error::RegistryError;
use depbump::version::fetcher::MetadataFetcher;
use depbump::version::registry::Registry;
use depbump::version::types::PackageMetadata;

/// In-memory registry that counts fetches per package
#[derive(Default)]
pub struct MockRegistry {
    packages: HashMap<String, PackageMetadata>,
    fetches: Arc<AtomicUsize>,
    delay: Duration,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `versions` with `latest` set to the last one
    pub fn with_versions(self, package: &str, versions: Vec<&str>) -> Self {
        let latest = versions.last().map(|v| v.to_string());
        let metadata = PackageMetadata::new(
            package,
            versions.into_iter().map(|v| v.to_string()).collect(),
        )
        .with_dist_tags(latest.into_iter().map(|v| ("latest".to_string(), v)).collect());
        self.with_metadata(metadata)
    }

    pub fn with_metadata(mut self, metadata: PackageMetadata) -> Self {
        self.packages.insert(metadata.name.clone(), metadata);
        self
    }

    /// Hold every fetch open for `delay` so concurrent callers overlap
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Handle to the fetch counter, readable after the registry is moved
    pub fn fetch_counter(&self) -> Arc<AtomicUsize> {
        self.fetches.clone()
    }
}

#[async_trait]
impl Registry for MockRegistry {
    async fn fetch_metadata(&self, package_name: &str) -> Result<PackageMetadata, RegistryError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.packages
            .get(package_name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(package_name.to_string()))
    }
}

pub fn fetch_count(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

/// Create a resolver over `registry` with no persistent cache
pub fn create_test_resolver(registry: MockRegistry, options: ResolveOptions) -> DependencyResolver {
    let fetcher = MetadataFetcher::new(Arc::new(registry));
    DependencyResolver::new(Arc::new(fetcher), options)
}

/// Create a cache pre-populated with `packages`
pub fn create_test_cache(packages: &[(&str, Vec<&str>)]) -> (TempDir, Arc<Cache>) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let cache = Cache::new(&db_path, 86_400_000).unwrap();

    for (package_name, versions) in packages {
        let metadata = PackageMetadata::new(
            *package_name,
            versions.iter().map(|v| v.to_string()).collect(),
        );
        cache.replace_metadata(&metadata).unwrap();
    }

    (temp_dir, Arc::new(cache))
}
