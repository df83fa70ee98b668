use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::parser::types::SourceField;
use crate::resolve::dependency::ResolveOptions;
use crate::resolve::filter::DependencyFilter;
use crate::resolve::mode::{PackageMode, PackageModeTable};
use crate::version::registries::npm::{DEFAULT_BASE_URL, NpmRegistry};
use crate::version::select::RangeMode;

// =============================================================================
// Time-related constants
// =============================================================================

/// Default freshness window for cached metadata in milliseconds (30 minutes)
pub const DEFAULT_CACHE_TTL_MS: i64 = 30 * 60 * 1000;

/// Timeout for fetch operations in milliseconds (30 seconds)
pub const FETCH_TIMEOUT_MS: u64 = 30_000;

/// Delay between starting each fetch request to avoid rate limiting (10ms)
pub const FETCH_STAGGER_DELAY_MS: u64 = 10;

/// Resolutions in flight per manifest
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Config file looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "depbump.json";

/// Environment variable holding an EnvFilter directive
pub const LOG_ENV_VAR: &str = "DEPBUMP_LOG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

/// depbump.json configuration structure
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub mode: RangeMode,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub include_locked: bool,
    pub recursive: bool,
    pub write: bool,
    /// Check `peerDependencies` too
    pub peer: bool,
    /// Show dependencies that are already up to date
    pub all: bool,
    pub fail_on_outdated: bool,
    /// Per-table switches keyed by field name (e.g. "devDependencies")
    pub dep_fields: IndexMap<String, bool>,
    /// Per-package modes; keys are names, globs or `/regex/`, tried in order
    pub package_mode: IndexMap<String, PackageMode>,
    pub cache: CacheConfig,
    /// npm registry base URL
    pub registry: String,
    /// Registry base URLs for specific scopes (e.g. "@corp")
    pub scoped_registries: IndexMap<String, String>,
    pub concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: RangeMode::Default,
            include: Vec::new(),
            exclude: Vec::new(),
            include_locked: false,
            recursive: false,
            write: false,
            peer: false,
            all: false,
            fail_on_outdated: false,
            dep_fields: IndexMap::new(),
            package_mode: IndexMap::new(),
            cache: CacheConfig::default(),
            registry: DEFAULT_BASE_URL.to_string(),
            scoped_registries: IndexMap::new(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Cache-related configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    /// Freshness window in milliseconds
    pub ttl: i64,
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_CACHE_TTL_MS,
            enabled: true,
        }
    }
}

/// Command-line values layered over the file configuration
///
/// Flags only ever switch behavior on; lists are appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub mode: Option<RangeMode>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub include_locked: bool,
    pub recursive: bool,
    pub write: bool,
    pub peer: bool,
    pub all: bool,
    pub fail_on_outdated: bool,
    pub no_cache: bool,
}

impl Config {
    /// Load `depbump.json` from `dir`, or defaults when it does not exist
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn merge(mut self, overrides: Overrides) -> Self {
        if let Some(mode) = overrides.mode {
            self.mode = mode;
        }
        self.include.extend(overrides.include);
        self.exclude.extend(overrides.exclude);
        self.include_locked |= overrides.include_locked;
        self.recursive |= overrides.recursive;
        self.write |= overrides.write;
        self.peer |= overrides.peer;
        self.all |= overrides.all;
        self.fail_on_outdated |= overrides.fail_on_outdated;
        if overrides.no_cache {
            self.cache.enabled = false;
        }
        self
    }

    /// Whether entries from `field` are eligible for updates
    pub fn field_enabled(&self, field: SourceField) -> bool {
        self.dep_fields
            .get(field.as_str())
            .copied()
            .unwrap_or(field != SourceField::PeerDependencies || self.peer)
    }

    pub fn disabled_fields(&self) -> HashSet<SourceField> {
        SourceField::ALL
            .into_iter()
            .filter(|field| !self.field_enabled(*field))
            .collect()
    }

    /// npm client for the configured registry and scope overrides
    pub fn npm_registry(&self) -> NpmRegistry {
        self.scoped_registries
            .iter()
            .fold(NpmRegistry::new(&self.registry), |registry, (scope, url)| {
                registry.with_scope(scope, url)
            })
    }

    /// Compile patterns and build the options for the resolver
    pub fn resolve_options(&self) -> Result<ResolveOptions, ConfigError> {
        let invalid = |e: regex::Error| ConfigError::InvalidPattern(e.to_string());

        Ok(ResolveOptions {
            mode: self.mode,
            include_locked: self.include_locked,
            package_modes: PackageModeTable::compile(&self.package_mode).map_err(invalid)?,
            filter: DependencyFilter::compile(&self.include, &self.exclude).map_err(invalid)?,
        })
    }
}

/// Returns the path to the data directory for depbump.
/// Uses $XDG_CACHE_HOME/depbump if XDG_CACHE_HOME is set,
/// otherwise falls back to ~/.cache/depbump,
/// or ./depbump if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_CACHE_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the database file.
pub fn db_path() -> PathBuf {
    data_dir().join("metadata.db")
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("depbump.log")
}

fn data_dir_with_env(xdg_cache_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_cache_home
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".cache")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("depbump")
}
