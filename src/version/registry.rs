//! Registry trait for fetching package metadata

#[cfg(test)]
use mockall::automock;

use crate::version::error::RegistryError;
use crate::version::types::PackageMetadata;

/// Trait for fetching package metadata from a registry
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Registry: Send + Sync {
    /// Fetches versions, dist-tags and publish times for a package
    ///
    /// # Arguments
    /// * `package_name` - The registry name of the package (e.g., "@types/node")
    ///
    /// # Returns
    /// * `Ok(PackageMetadata)` - Versions ordered from oldest to newest
    /// * `Err(RegistryError)` - If the fetch fails
    async fn fetch_metadata(&self, package_name: &str) -> Result<PackageMetadata, RegistryError>;
}
