//! Range-prefix style of a version specifier
//!
//! A resolved version is written back in the same style as the specifier
//! it replaces: `^1.2.3` becomes `^1.5.0`, `~1.2.3` becomes `~1.2.9`, `*`
//! stays `*`.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangePrefix {
    /// Bare exact version (`1.2.3`)
    None,
    Caret,
    Tilde,
    Gte,
    Lte,
    Gt,
    Lt,
    /// `*` or empty
    Wildcard,
    /// Style could not be recognized
    Invalid,
}

impl RangePrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            RangePrefix::None | RangePrefix::Invalid => "",
            RangePrefix::Caret => "^",
            RangePrefix::Tilde => "~",
            RangePrefix::Gte => ">=",
            RangePrefix::Lte => "<=",
            RangePrefix::Gt => ">",
            RangePrefix::Lt => "<",
            RangePrefix::Wildcard => "*",
        }
    }
}

impl fmt::Display for RangePrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operators checked in priority order; `>=` must come before `>`
const LEADING_OPERATORS: [(&str, RangePrefix); 4] = [
    (">=", RangePrefix::Gte),
    ("<=", RangePrefix::Lte),
    (">", RangePrefix::Gt),
    ("<", RangePrefix::Lt),
];

/// Detect the range-prefix style of a specifier
///
/// Loose x-ranges map onto the nearest strict style by the position of the
/// first `x`: `x.x.x` -> wildcard, `1.x` -> caret, `1.2.x` -> tilde.
/// Anything starting with a digit is treated as a bare version, which does
/// not distinguish partial versions like `1.2` from exact ones.
pub fn extract_prefix(specifier: &str) -> RangePrefix {
    let specifier = specifier.trim();
    if specifier.is_empty() || specifier == "*" {
        return RangePrefix::Wildcard;
    }

    if specifier.starts_with('^') {
        return RangePrefix::Caret;
    }
    if specifier.starts_with('~') {
        return RangePrefix::Tilde;
    }

    if let Some((_, prefix)) = LEADING_OPERATORS
        .iter()
        .find(|(op, _)| specifier.starts_with(op))
    {
        return *prefix;
    }

    let segments: Vec<&str> = specifier.split('.').collect();
    if let Some(position) = segments.iter().position(|s| is_wildcard_segment(s)) {
        match position {
            0 => return RangePrefix::Wildcard,
            1 => return RangePrefix::Caret,
            2 => return RangePrefix::Tilde,
            _ => {}
        }
    }

    if specifier.starts_with(|c: char| c.is_ascii_digit()) {
        RangePrefix::None
    } else {
        RangePrefix::Invalid
    }
}

fn is_wildcard_segment(segment: &str) -> bool {
    matches!(segment, "x" | "X" | "*")
}

/// Re-express a concrete version in the given style
///
/// Returns `None` when the style cannot be re-expressed.
pub fn apply_prefix(prefix: RangePrefix, version: Option<&str>) -> Option<String> {
    let version = version?;
    match prefix {
        RangePrefix::Invalid => None,
        RangePrefix::Wildcard => Some("*".to_string()),
        _ => Some(format!("{prefix}{version}")),
    }
}

/// Write `target` in the same style as `current`
pub fn reprefix(current: &str, target: &str) -> Option<String> {
    apply_prefix(extract_prefix(current), Some(target))
}

/// A bare exact version with no range operator, e.g. `4.0.0`
pub fn is_locked(specifier: &str) -> bool {
    extract_prefix(specifier) == RangePrefix::None && semver::Version::parse(specifier.trim()).is_ok()
}
