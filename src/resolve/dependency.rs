//! Per-dependency resolution pipeline
//!
//! Each raw manifest entry passes through mode merging, special-case
//! detection, alias unwrapping, metadata fetch, target selection, prefix
//! re-application and diff classification, ending in exactly one of three
//! outcomes: unchanged, update available, or a captured error.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::parser::types::RawDependency;
use crate::resolve::filter::DependencyFilter;
use crate::resolve::mode::{PackageMode, PackageModeTable, merge_mode};
use crate::resolve::specifier::{self, Alias};
use crate::version::diff::{DiffClass, classify};
use crate::version::error::ResolveError;
use crate::version::fetcher::MetadataFetcher;
use crate::version::prefix::{RangePrefix, extract_prefix, is_locked, reprefix};
use crate::version::select::{RangeMode, select_target};
use crate::version::semver::{compare, min_version, parse};
use crate::version::types::PackageMetadata;

/// A dependency with its computed target
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDependency {
    pub raw: RawDependency,
    /// Specifier to write back, in the same style as the current one
    pub target_version: String,
    pub current_version_time: Option<DateTime<Utc>>,
    pub target_version_time: Option<DateTime<Utc>>,
    pub diff: DiffClass,
    pub will_update: bool,
    /// `latest` when it is newer than the chosen target
    pub latest_version_available: Option<String>,
    pub resolve_error: Option<ResolveError>,
    pub package_metadata: Option<Arc<PackageMetadata>>,
}

impl ResolvedDependency {
    /// Leave the dependency exactly as written
    fn unchanged(raw: RawDependency, metadata: Option<Arc<PackageMetadata>>) -> Self {
        Self {
            target_version: raw.current_version.clone(),
            raw,
            current_version_time: None,
            target_version_time: None,
            diff: DiffClass::None,
            will_update: false,
            latest_version_available: None,
            resolve_error: None,
            package_metadata: metadata,
        }
    }

    fn failed(
        raw: RawDependency,
        error: ResolveError,
        metadata: Option<Arc<PackageMetadata>>,
    ) -> Self {
        Self {
            diff: DiffClass::Error,
            resolve_error: Some(error),
            ..Self::unchanged(raw, metadata)
        }
    }

    /// Build the record for moving `raw` to the concrete `target`
    fn with_target(raw: RawDependency, metadata: Arc<PackageMetadata>, target: &str) -> Self {
        let alias = Alias::parse(&raw.current_version);
        let current = alias
            .as_ref()
            .map_or(raw.current_version.as_str(), |a| a.version.as_str())
            .to_string();

        let target_parsed = match parse(target) {
            Ok(version) => version,
            Err(e) => return Self::failed(raw, e, Some(metadata)),
        };

        let current_min = min_version(&current);
        let mut diff = current_min
            .as_ref()
            .map_or(DiffClass::Error, |min| classify(min, &target_parsed));
        let exceeds = current_min
            .as_ref()
            .is_some_and(|min| &target_parsed > min);

        let (target_version, will_update) = match reprefix(&current, target) {
            // A wildcard already admits every target
            Some(_) if extract_prefix(&current) == RangePrefix::Wildcard => {
                (raw.current_version.clone(), false)
            }
            Some(prefixed) => {
                let written = match &alias {
                    Some(alias) => alias.with_version(&prefixed),
                    None => prefixed,
                };
                (written, diff.is_change() && exceeds)
            }
            // The current style cannot be re-expressed; keep it as written
            None => (raw.current_version.clone(), false),
        };
        if target_version == raw.current_version && diff.is_change() {
            diff = DiffClass::None;
        }

        let latest_version_available = metadata
            .latest()
            .filter(|latest| compare(latest, target).is_ok_and(Ordering::is_gt))
            .map(str::to_string);

        Self {
            current_version_time: current_min
                .and_then(|min| metadata.publish_time(&min.to_string())),
            target_version_time: metadata.publish_time(target),
            target_version,
            diff,
            will_update,
            latest_version_available,
            resolve_error: None,
            package_metadata: Some(metadata),
            raw,
        }
    }

    /// Switch to a different concrete version chosen by the user
    ///
    /// Re-applies the current prefix style and re-classifies the change
    /// against the metadata this dependency was resolved with.
    pub fn retarget(&mut self, version: &str) -> Result<(), ResolveError> {
        let metadata = self
            .package_metadata
            .clone()
            .ok_or_else(|| ResolveError::InvalidVersion(version.to_string()))?;

        let resolved = Self::with_target(self.raw.clone(), metadata, version);
        if let Some(error) = resolved.resolve_error {
            return Err(error);
        }

        *self = resolved;
        Ok(())
    }
}

/// Options shared by every resolution in a run
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub mode: RangeMode,
    /// Allow exact, unranged versions to be updated
    pub include_locked: bool,
    pub package_modes: PackageModeTable,
    pub filter: DependencyFilter,
}

pub struct DependencyResolver {
    fetcher: Arc<MetadataFetcher>,
    options: ResolveOptions,
}

impl DependencyResolver {
    pub fn new(fetcher: Arc<MetadataFetcher>, options: ResolveOptions) -> Self {
        Self { fetcher, options }
    }

    /// Resolve a single dependency; errors are captured in the record
    pub async fn resolve_dependency(&self, raw: RawDependency) -> ResolvedDependency {
        let key = specifier::package_name(&raw.name).to_string();
        let alias = Alias::parse(&raw.current_version);
        let (lookup_name, current) = match &alias {
            Some(alias) => (alias.registry_name(), alias.version.clone()),
            None => (key.clone(), raw.current_version.clone()),
        };

        let package_mode = self
            .options
            .package_modes
            .lookup(&raw.name)
            .or_else(|| self.options.package_modes.lookup(&key));
        let mode = match merge_mode(self.options.mode, package_mode) {
            PackageMode::Mode(mode) => mode,
            PackageMode::Ignore => {
                debug!("Ignoring {} by package mode", raw.name);
                return ResolvedDependency::unchanged(raw, None);
            }
        };

        if specifier::is_special(&raw.current_version)
            || !raw.update
            || !self.options.filter.should_update(&key)
        {
            return ResolvedDependency::unchanged(raw, None);
        }

        let locked = is_locked(&current);
        if locked && !self.options.include_locked {
            debug!("Skipping locked version {}@{}", raw.name, current);
            return ResolvedDependency::unchanged(raw, None);
        }

        let metadata = match self.fetcher.fetch(&lookup_name).await {
            Ok(metadata) => metadata,
            Err(e) => return ResolvedDependency::failed(raw, e.into(), None),
        };

        let select = |mode| {
            select_target(&metadata.versions, &current, mode, &metadata.dist_tags)
        };

        let mut target = match select(mode) {
            Ok(target) => target,
            Err(e) => return ResolvedDependency::failed(raw, e, Some(metadata)),
        };

        // An exact version only ever matches itself; widen to minor-safe updates
        if locked && mode == RangeMode::Default && target.as_deref() == Some(current.trim()) {
            target = match select(RangeMode::Minor) {
                Ok(target) => target,
                Err(e) => return ResolvedDependency::failed(raw, e, Some(metadata)),
            };
        }

        match target {
            Some(target) => ResolvedDependency::with_target(raw, metadata, &target),
            None => ResolvedDependency::unchanged(raw, Some(metadata)),
        }
    }
}
