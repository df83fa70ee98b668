//! Concurrent resolution of a dependency list

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::StreamExt;
use futures::stream;
use tokio::time::sleep;
use tracing::debug;

use crate::parser::types::RawDependency;
use crate::resolve::dependency::{DependencyResolver, ResolvedDependency};

/// Scheduling knobs for [`resolve_all`]
#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    /// Maximum resolutions in flight
    pub concurrency: usize,
    /// Delay between the starts of the first wave of resolutions
    pub stagger: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: crate::config::DEFAULT_CONCURRENCY,
            stagger: Duration::from_millis(crate::config::FETCH_STAGGER_DELAY_MS),
        }
    }
}

/// Resolve every dependency concurrently
///
/// Results keep the input order. `on_progress(name, completed, total)` is
/// called after each resolution finishes; calls may arrive in any order but
/// `completed` reaches `total` exactly once.
pub async fn resolve_all<F>(
    resolver: &DependencyResolver,
    deps: Vec<RawDependency>,
    options: BatchOptions,
    on_progress: F,
) -> Vec<ResolvedDependency>
where
    F: Fn(&str, usize, usize),
{
    let total = deps.len();
    let completed = AtomicUsize::new(0);
    let concurrency = options.concurrency.max(1);
    debug!("Resolving {} dependencies", total);

    let completed = &completed;
    let on_progress = &on_progress;
    stream::iter(deps.into_iter().enumerate())
        .map(|(i, dep)| async move {
            // Ramp up the first wave to avoid bursting the registry
            if i < concurrency && !options.stagger.is_zero() {
                sleep(options.stagger * i as u32).await;
            }

            let resolved = resolver.resolve_dependency(dep).await;
            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            on_progress(&resolved.raw.name, done, total);
            resolved
        })
        .buffered(concurrency)
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::types::SourceField;
    use crate::resolve::dependency::ResolveOptions;
    use crate::version::fetcher::MetadataFetcher;
    use crate::version::registry::MockRegistry;
    use crate::version::types::PackageMetadata;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    fn raw(name: &str, version: &str) -> RawDependency {
        RawDependency {
            name: name.to_string(),
            current_version: version.to_string(),
            source: SourceField::Dependencies,
            parents: vec![],
            update: true,
            start_offset: 0,
            end_offset: 0,
            line: 0,
            column: 0,
        }
    }

    fn no_stagger(concurrency: usize) -> BatchOptions {
        BatchOptions {
            concurrency,
            stagger: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn resolve_all_keeps_order_and_reports_progress() {
        let mut registry = MockRegistry::new();
        registry.expect_fetch_metadata().returning(|name| {
            Ok(
                PackageMetadata::new(name, vec!["1.0.0".to_string(), "1.1.0".to_string()])
                    .with_dist_tags(HashMap::from([(
                        "latest".to_string(),
                        "1.1.0".to_string(),
                    )])),
            )
        });
        let fetcher = Arc::new(MetadataFetcher::new(Arc::new(registry)));
        let resolver = DependencyResolver::new(fetcher, ResolveOptions::default());

        let deps = vec![raw("a", "^1.0.0"), raw("b", "^1.0.0"), raw("c", "^1.1.0")];
        let progress = Mutex::new(Vec::new());

        let resolved = resolve_all(&resolver, deps, no_stagger(2), |name, done, total| {
            progress.lock().unwrap().push((name.to_string(), done, total));
        })
        .await;

        let names: Vec<_> = resolved.iter().map(|r| r.raw.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(resolved[0].will_update);
        assert!(!resolved[2].will_update);

        let progress = progress.into_inner().unwrap();
        assert_eq!(progress.len(), 3);
        let mut counts: Vec<_> = progress.iter().map(|(_, done, _)| *done).collect();
        counts.sort();
        assert_eq!(counts, vec![1, 2, 3]);
        assert!(progress.iter().all(|(_, _, total)| *total == 3));
    }

    #[tokio::test]
    async fn same_package_is_fetched_once() {
        let mut registry = MockRegistry::new();
        registry
            .expect_fetch_metadata()
            .withf(|name| name == "left-pad")
            .times(1)
            .returning(|name| Ok(PackageMetadata::new(name, vec!["1.3.0".to_string()])));
        let fetcher = Arc::new(MetadataFetcher::new(Arc::new(registry)));
        let resolver = DependencyResolver::new(fetcher, ResolveOptions::default());

        let deps = vec![raw("left-pad", "^1.0.0"), raw("left-pad", "^1.1.0")];
        let resolved = resolve_all(&resolver, deps, no_stagger(8), |_, _, _| {}).await;

        assert_eq!(resolved[0].target_version, "^1.3.0");
        assert_eq!(resolved[1].target_version, "^1.3.0");
    }

    #[tokio::test]
    async fn errors_do_not_abort_the_batch() {
        let mut registry = MockRegistry::new();
        registry.expect_fetch_metadata().returning(|name| {
            if name == "ghost" {
                Err(crate::version::error::RegistryError::NotFound(
                    name.to_string(),
                ))
            } else {
                Ok(PackageMetadata::new(name, vec!["2.0.0".to_string()]))
            }
        });
        let fetcher = Arc::new(MetadataFetcher::new(Arc::new(registry)));
        let resolver = DependencyResolver::new(fetcher, ResolveOptions::default());

        let deps = vec![raw("ghost", "^1.0.0"), raw("real", "^2.0.0")];
        let resolved = resolve_all(&resolver, deps, no_stagger(4), |_, _, _| {}).await;

        assert!(resolved[0].resolve_error.is_some());
        assert!(resolved[1].resolve_error.is_none());
    }

    #[tokio::test]
    async fn empty_input_resolves_to_empty_output() {
        let mut registry = MockRegistry::new();
        registry.expect_fetch_metadata().times(0);
        let fetcher = Arc::new(MetadataFetcher::new(Arc::new(registry)));
        let resolver = DependencyResolver::new(fetcher, ResolveOptions::default());

        let resolved = resolve_all(&resolver, vec![], no_stagger(4), |_, _, _| {}).await;

        assert!(resolved.is_empty());
    }
}
