//! Maximum-satisfying target selection
//!
//! Given every published version of a package, its dist-tags and the
//! specifier currently written in the manifest, pick the single best
//! version to move to under a [`RangeMode`].

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use semver::Version;
use serde::Deserialize;

use crate::version::error::ResolveError;
use crate::version::range::VersionRange;
use crate::version::semver::{find_semantic_max, min_version};

/// Update policy applied to a dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RangeMode {
    /// Stay within the range as written
    #[default]
    Default,
    /// Any newer version at or below `latest`
    Major,
    /// Same major (`^`)
    Minor,
    /// Same major.minor (`~`)
    Patch,
    /// The `latest` dist-tag
    Latest,
    /// The highest published version, prereleases included
    Newest,
    /// The `next` dist-tag
    Next,
}

impl RangeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RangeMode::Default => "default",
            RangeMode::Major => "major",
            RangeMode::Minor => "minor",
            RangeMode::Patch => "patch",
            RangeMode::Latest => "latest",
            RangeMode::Newest => "newest",
            RangeMode::Next => "next",
        }
    }
}

impl fmt::Display for RangeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RangeMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(RangeMode::Default),
            "major" => Ok(RangeMode::Major),
            "minor" => Ok(RangeMode::Minor),
            "patch" => Ok(RangeMode::Patch),
            "latest" => Ok(RangeMode::Latest),
            "newest" => Ok(RangeMode::Newest),
            "next" => Ok(RangeMode::Next),
            _ => Err(()),
        }
    }
}

/// Derive the range searched under `mode` from the current specifier
///
/// `default` keeps the range as written; the other modes widen the range
/// floor (the current minimum version) with `>=`, `^` or `~`.
pub fn change_version_range(current: &str, mode: RangeMode) -> Result<String, ResolveError> {
    let operator = match mode {
        RangeMode::Default => return Ok(current.to_string()),
        RangeMode::Major => ">=",
        RangeMode::Minor => "^",
        RangeMode::Patch => "~",
        RangeMode::Latest | RangeMode::Newest | RangeMode::Next => {
            return Err(ResolveError::InvalidRange(current.to_string()));
        }
    };

    let min = min_version(current).ok_or_else(|| ResolveError::InvalidRange(current.to_string()))?;
    Ok(format!("{operator}{min}"))
}

/// Select the best target version
///
/// Returns `Ok(None)` when nothing satisfies the derived range, and
/// `InvalidRange` when the range cannot be derived from `current`.
pub fn select_target(
    versions: &[String],
    current: &str,
    mode: RangeMode,
    dist_tags: &HashMap<String, String>,
) -> Result<Option<String>, ResolveError> {
    match mode {
        RangeMode::Latest => return Ok(dist_tags.get("latest").cloned()),
        RangeMode::Next => return Ok(dist_tags.get("next").cloned()),
        RangeMode::Newest => return Ok(find_semantic_max(versions)),
        RangeMode::Default if current.trim().is_empty() || current.trim() == "*" => {
            return Ok(None);
        }
        _ => {}
    }

    let derived = change_version_range(current, mode)?;
    let range =
        VersionRange::parse(&derived).ok_or_else(|| ResolveError::InvalidRange(derived.clone()))?;

    // Never jump past the published `latest` when it is itself in range
    let ceiling = dist_tags
        .get("latest")
        .and_then(|latest| Version::parse(latest).ok())
        .filter(|latest| range.satisfies(latest, false));

    let best = versions
        .iter()
        .filter_map(|v| Version::parse(v).ok().map(|parsed| (v, parsed)))
        .filter(|(_, parsed)| range.satisfies(parsed, false))
        .filter(|(_, parsed)| ceiling.as_ref().is_none_or(|max| parsed <= max))
        .max_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(original, _)| original.clone());

    Ok(best)
}
