//! Classification of the size of a version change

use std::fmt;

use semver::Version;
use serde::Serialize;

use crate::version::semver::satisfies;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffClass {
    Major,
    Premajor,
    Minor,
    Preminor,
    Patch,
    Prepatch,
    Prerelease,
    None,
    Error,
}

impl DiffClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiffClass::Major => "major",
            DiffClass::Premajor => "premajor",
            DiffClass::Minor => "minor",
            DiffClass::Preminor => "preminor",
            DiffClass::Patch => "patch",
            DiffClass::Prepatch => "prepatch",
            DiffClass::Prerelease => "prerelease",
            DiffClass::None => "none",
            DiffClass::Error => "error",
        }
    }

    /// Whether this class describes an actual upgrade
    pub fn is_change(&self) -> bool {
        !matches!(self, DiffClass::None | DiffClass::Error)
    }

    fn into_prerelease(self) -> Self {
        match self {
            DiffClass::Major => DiffClass::Premajor,
            DiffClass::Minor => DiffClass::Preminor,
            DiffClass::Patch => DiffClass::Prepatch,
            other => other,
        }
    }
}

impl fmt::Display for DiffClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify the change from `current` to `target`
///
/// Tilde compatibility is tested before caret compatibility: a target
/// inside both is a patch, inside caret only is a minor, and a target
/// that is tilde- but not caret-compatible (only possible around 0.0.x)
/// is graded major. Targets that are not greater are an error.
///
/// When the target is a prerelease the grade moves to its `pre*` variant;
/// a change that only touches the prerelease tag is `prerelease`.
pub fn classify(current: &Version, target: &Version) -> DiffClass {
    if current == target {
        return DiffClass::None;
    }

    let within = |operator: &str| {
        satisfies(target, &format!("{operator}{current}"), true).unwrap_or(false)
    };

    let base = if within("~") {
        if within("^") {
            DiffClass::Patch
        } else {
            DiffClass::Major
        }
    } else if within("^") {
        DiffClass::Minor
    } else if within(">=") {
        DiffClass::Major
    } else {
        return DiffClass::Error;
    };

    if target.pre.is_empty() {
        return base;
    }

    let same_tuple = current.major == target.major
        && current.minor == target.minor
        && current.patch == target.patch;
    if same_tuple && !current.pre.is_empty() {
        DiffClass::Prerelease
    } else {
        base.into_prerelease()
    }
}
