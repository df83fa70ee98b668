//! Request-coalescing metadata fetcher
//!
//! Every package is fetched at most once per run: concurrent callers asking
//! for the same name share one in-flight request, and later callers reuse
//! its outcome. A persistent [`MetadataStore`] is consulted before the
//! network and written through after a successful fetch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tracing::{debug, warn};

use crate::version::cache::{CacheLookup, MetadataStore};
use crate::version::error::{MetadataFetchError, RegistryError};
use crate::version::registry::Registry;
use crate::version::types::PackageMetadata;

pub type FetchResult = Result<Arc<PackageMetadata>, MetadataFetchError>;

type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

pub struct MetadataFetcher {
    registry: Arc<dyn Registry>,
    store: Option<Arc<dyn MetadataStore>>,
    requests: Mutex<HashMap<String, SharedFetch>>,
}

impl MetadataFetcher {
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self {
            registry,
            store: None,
            requests: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn MetadataStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Fetch metadata for `package_name`, sharing any request already made
    pub async fn fetch(&self, package_name: &str) -> FetchResult {
        let request = {
            let mut requests = self
                .requests
                .lock()
                .map_err(|_| MetadataFetchError::Failed("fetcher lock poisoned".to_string()))?;

            requests
                .entry(package_name.to_string())
                .or_insert_with(|| {
                    load(
                        package_name.to_string(),
                        Arc::clone(&self.registry),
                        self.store.clone(),
                    )
                    .boxed()
                    .shared()
                })
                .clone()
        };

        request.await
    }
}

async fn load(
    package_name: String,
    registry: Arc<dyn Registry>,
    store: Option<Arc<dyn MetadataStore>>,
) -> FetchResult {
    if let Some(store) = &store {
        match store.lookup(&package_name) {
            Ok(CacheLookup::Hit(metadata)) => {
                debug!("Cache hit for {}", package_name);
                return Ok(Arc::new(metadata));
            }
            Ok(CacheLookup::NotFound) => {
                debug!("Cached not-found for {}", package_name);
                return Err(MetadataFetchError::NotFound(package_name));
            }
            Ok(CacheLookup::Miss) => {}
            Err(e) => warn!("Cache lookup failed for {}: {}", package_name, e),
        }
    }

    debug!("Fetching metadata for {}", package_name);
    match registry.fetch_metadata(&package_name).await {
        Ok(metadata) => {
            if let Some(store) = &store {
                let _ = store
                    .replace_metadata(&metadata)
                    .inspect_err(|e| warn!("Failed to cache {}: {}", package_name, e));
            }
            Ok(Arc::new(metadata))
        }
        Err(RegistryError::NotFound(name)) => {
            if let Some(store) = &store {
                let _ = store
                    .mark_not_found(&name)
                    .inspect_err(|e| warn!("Failed to mark {} as not found: {}", name, e));
            }
            Err(MetadataFetchError::NotFound(name))
        }
        Err(e) => {
            warn!("Failed to fetch {}: {}", package_name, e);
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::cache::MockMetadataStore;
    use crate::version::error::CacheError;
    use crate::version::registry::MockRegistry;
    use futures::future::join_all;

    fn lodash() -> PackageMetadata {
        PackageMetadata::new("lodash", vec!["4.17.20".to_string(), "4.17.21".to_string()])
    }

    #[tokio::test]
    async fn concurrent_fetches_share_one_request() {
        let mut registry = MockRegistry::new();
        registry
            .expect_fetch_metadata()
            .withf(|name| name == "lodash")
            .times(1)
            .returning(|_| Ok(lodash()));

        let fetcher = MetadataFetcher::new(Arc::new(registry));

        let results = join_all((0..5).map(|_| fetcher.fetch("lodash"))).await;

        for result in results {
            assert_eq!(result.unwrap().versions, lodash().versions);
        }
    }

    #[tokio::test]
    async fn failures_are_memoized() {
        let mut registry = MockRegistry::new();
        registry
            .expect_fetch_metadata()
            .times(1)
            .returning(|name| Err(RegistryError::NotFound(name.to_string())));

        let fetcher = MetadataFetcher::new(Arc::new(registry));

        for _ in 0..3 {
            assert_eq!(
                fetcher.fetch("ghost").await,
                Err(MetadataFetchError::NotFound("ghost".to_string()))
            );
        }
    }

    #[tokio::test]
    async fn distinct_packages_are_fetched_separately() {
        let mut registry = MockRegistry::new();
        registry
            .expect_fetch_metadata()
            .times(2)
            .returning(|name| Ok(PackageMetadata::new(name, vec!["1.0.0".to_string()])));

        let fetcher = MetadataFetcher::new(Arc::new(registry));

        let a = fetcher.fetch("a").await.unwrap();
        let b = fetcher.fetch("b").await.unwrap();
        assert_eq!(a.name, "a");
        assert_eq!(b.name, "b");
    }

    #[tokio::test]
    async fn store_hit_skips_registry() {
        let mut registry = MockRegistry::new();
        registry.expect_fetch_metadata().times(0);

        let mut store = MockMetadataStore::new();
        store
            .expect_lookup()
            .withf(|name| name == "lodash")
            .times(1)
            .returning(|_| Ok(CacheLookup::Hit(lodash())));

        let fetcher = MetadataFetcher::new(Arc::new(registry)).with_store(Arc::new(store));

        assert_eq!(fetcher.fetch("lodash").await.unwrap().versions.len(), 2);
    }

    #[tokio::test]
    async fn store_miss_writes_through() {
        let mut registry = MockRegistry::new();
        registry
            .expect_fetch_metadata()
            .times(1)
            .returning(|_| Ok(lodash()));

        let mut store = MockMetadataStore::new();
        store
            .expect_lookup()
            .times(1)
            .returning(|_| Ok(CacheLookup::Miss));
        store
            .expect_replace_metadata()
            .withf(|metadata| metadata.name == "lodash")
            .times(1)
            .returning(|_| Ok(()));

        let fetcher = MetadataFetcher::new(Arc::new(registry)).with_store(Arc::new(store));

        assert!(fetcher.fetch("lodash").await.is_ok());
    }

    #[tokio::test]
    async fn registry_not_found_is_recorded_in_store() {
        let mut registry = MockRegistry::new();
        registry
            .expect_fetch_metadata()
            .times(1)
            .returning(|name| Err(RegistryError::NotFound(name.to_string())));

        let mut store = MockMetadataStore::new();
        store
            .expect_lookup()
            .times(1)
            .returning(|_| Ok(CacheLookup::Miss));
        store
            .expect_mark_not_found()
            .withf(|name| name == "ghost")
            .times(1)
            .returning(|_| Ok(()));

        let fetcher = MetadataFetcher::new(Arc::new(registry)).with_store(Arc::new(store));

        assert!(matches!(
            fetcher.fetch("ghost").await,
            Err(MetadataFetchError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn store_errors_fall_back_to_registry() {
        let mut registry = MockRegistry::new();
        registry
            .expect_fetch_metadata()
            .times(1)
            .returning(|_| Ok(lodash()));

        let mut store = MockMetadataStore::new();
        store
            .expect_lookup()
            .returning(|_| Err(CacheError::LockPoisoned));
        store
            .expect_replace_metadata()
            .returning(|_| Err(CacheError::LockPoisoned));

        let fetcher = MetadataFetcher::new(Arc::new(registry)).with_store(Arc::new(store));

        assert!(fetcher.fetch("lodash").await.is_ok());
    }

    #[tokio::test]
    async fn transport_failures_surface_as_failed() {
        let mut registry = MockRegistry::new();
        registry
            .expect_fetch_metadata()
            .times(1)
            .returning(|_| Err(RegistryError::InvalidResponse("boom".to_string())));

        let fetcher = MetadataFetcher::new(Arc::new(registry));

        assert!(matches!(
            fetcher.fetch("lodash").await,
            Err(MetadataFetchError::Failed(_))
        ));
    }
}
