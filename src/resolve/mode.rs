//! Per-package mode overrides and their merge with the requested mode

use std::collections::HashMap;
use std::str::FromStr;

use serde::Deserialize;

use crate::resolve::filter::NamePattern;
use crate::version::select::RangeMode;

/// Mode configured for a single package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum PackageMode {
    Mode(RangeMode),
    /// Never touch the package
    Ignore,
}

impl FromStr for PackageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "ignore" {
            return Ok(PackageMode::Ignore);
        }
        RangeMode::from_str(s)
            .map(PackageMode::Mode)
            .map_err(|_| format!("unknown package mode \"{s}\""))
    }
}

impl TryFrom<String> for PackageMode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// How far a mode may move a dependency; `latest` and `next` share a rank
fn permissiveness(mode: RangeMode) -> u8 {
    match mode {
        RangeMode::Default => 0,
        RangeMode::Patch => 1,
        RangeMode::Minor => 2,
        RangeMode::Major => 3,
        RangeMode::Latest | RangeMode::Next => 4,
        RangeMode::Newest => 5,
    }
}

/// Merge a per-package override with the globally requested mode
///
/// The override applies when the global mode is `default`, or when it is
/// no more permissive than the global mode. A more permissive override, or
/// a different mode of the same rank, conflicts and yields `Ignore`.
pub fn merge_mode(global: RangeMode, package: Option<PackageMode>) -> PackageMode {
    let package = match package {
        None => return PackageMode::Mode(global),
        Some(PackageMode::Ignore) => return PackageMode::Ignore,
        Some(PackageMode::Mode(mode)) => mode,
    };

    if package == global || global == RangeMode::Default {
        return PackageMode::Mode(package);
    }

    let (package_rank, global_rank) = (permissiveness(package), permissiveness(global));
    if package_rank < global_rank {
        PackageMode::Mode(package)
    } else {
        PackageMode::Ignore
    }
}

/// Override table keyed by exact package name or name pattern
#[derive(Debug, Clone, Default)]
pub struct PackageModeTable {
    exact: HashMap<String, PackageMode>,
    patterns: Vec<(NamePattern, PackageMode)>,
}

impl PackageModeTable {
    /// Build from `name-or-pattern -> mode` entries; keys containing `*` or
    /// written as `/regex/` are patterns
    pub fn compile<'a>(
        entries: impl IntoIterator<Item = (&'a String, &'a PackageMode)>,
    ) -> Result<Self, regex::Error> {
        let mut table = Self::default();
        for (key, mode) in entries {
            if key.contains('*') || (key.starts_with('/') && key.len() > 1) {
                table.patterns.push((NamePattern::compile(key)?, *mode));
            } else {
                table.exact.insert(key.clone(), *mode);
            }
        }
        Ok(table)
    }

    /// Exact names win over patterns; patterns are tried in order
    pub fn lookup(&self, name: &str) -> Option<PackageMode> {
        self.exact.get(name).copied().or_else(|| {
            self.patterns
                .iter()
                .find(|(pattern, _)| pattern.matches(name))
                .map(|(_, mode)| *mode)
        })
    }
}
