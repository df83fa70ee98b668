use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Cache lock poisoned")]
    LockPoisoned,

    #[error("Invalid cached data: {0}")]
    Serialization(String),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Rate limited: retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Package not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Failure to obtain metadata for a package.
///
/// Cloneable so a single in-flight fetch can hand the same outcome to
/// every dependency waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataFetchError {
    #[error("Package not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Failed(String),
}

impl From<RegistryError> for MetadataFetchError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(name) => MetadataFetchError::NotFound(name),
            other => MetadataFetchError::Failed(other.to_string()),
        }
    }
}

/// Errors captured per dependency; they never abort a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    #[error("Invalid version range \"{0}\"")]
    InvalidRange(String),

    #[error(transparent)]
    MetadataFetch(#[from] MetadataFetchError),
}

impl ResolveError {
    /// Short label used when rendering the error next to a dependency
    pub fn label(&self) -> &'static str {
        match self {
            ResolveError::MetadataFetch(MetadataFetchError::NotFound(_)) => "not found",
            ResolveError::InvalidRange(_) => "unresolvable range",
            ResolveError::InvalidVersion(_) => "invalid version",
            ResolveError::MetadataFetch(MetadataFetchError::Failed(_)) => "error",
        }
    }
}
