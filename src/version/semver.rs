use std::cmp::Ordering;

use semver::Version;

use crate::version::error::ResolveError;
use crate::version::range::VersionRange;

/// Parse a full concrete version, signaling `InvalidVersion` on failure
pub fn parse(version: &str) -> Result<Version, ResolveError> {
    Version::parse(version.trim()).map_err(|_| ResolveError::InvalidVersion(version.to_string()))
}

/// Order two concrete versions
pub fn compare(a: &str, b: &str) -> Result<Ordering, ResolveError> {
    Ok(parse(a)?.cmp(&parse(b)?))
}

/// Test whether `version` satisfies the `range` expression
pub fn satisfies(version: &Version, range: &str, include_prerelease: bool) -> Result<bool, ResolveError> {
    let range =
        VersionRange::parse(range).ok_or_else(|| ResolveError::InvalidRange(range.to_string()))?;
    Ok(range.satisfies(version, include_prerelease))
}

/// Lowest concrete version admitted by a range specifier (npm `minVersion`)
pub fn min_version(range: &str) -> Option<Version> {
    VersionRange::parse(range)?.min_version()
}

/// Find the semantically maximum version from a list
///
/// Handles both `v`-prefixed (e.g., "v1.0.0") and non-prefixed versions.
/// Invalid versions are skipped.
pub fn find_semantic_max(versions: &[String]) -> Option<String> {
    versions
        .iter()
        .filter_map(|v| {
            let v_stripped = v.strip_prefix('v').unwrap_or(v);
            Version::parse(v_stripped).ok().map(|parsed| (v, parsed))
        })
        .max_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(original, _)| original.clone())
}
