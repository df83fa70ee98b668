//! npm range expressions
//!
//! Supports the range syntax found in package manifests:
//! - `1.2.3`, `=1.2.3`, `v1.2.3` - exact match
//! - `^1.2.3` - compatible with version (>=1.2.3 <2.0.0)
//! - `~1.2.3` - approximately equivalent (>=1.2.3 <1.3.0)
//! - `>=1.2.3`, `>1.2.3`, `<=1.2.3`, `<1.2.3` - comparison operators
//! - `1.2.x`, `1.x`, `1`, `*`, `x`, `""` - wildcards and partial versions
//! - `1.0.0 - 2.0.0` - hyphen ranges
//! - `>=1.0.0 <2.0.0` (AND) and `^1.0.0 || ^2.0.0` (OR)

use semver::{Prerelease, Version};

/// A parsed range: OR of comparator sets, each set an AND of comparators
#[derive(Debug, Clone, PartialEq)]
pub struct VersionRange {
    sets: Vec<Vec<Comparator>>,
}

#[derive(Debug, Clone, PartialEq)]
enum Comparator {
    Exact(Version),
    /// ^1.2.3 means >=1.2.3 <2.0.0 (or narrower for 0.x)
    Caret(Version),
    /// ~1.2.3 means >=1.2.3 <1.3.0
    Tilde(Version),
    Gte(Version),
    Gt(Version),
    Lte(Version),
    Lt(Version),
    Any,
    /// 1.x means >=1.0.0 <2.0.0
    WildcardMajor(u64),
    /// 1.2.x means >=1.2.0 <1.3.0
    WildcardMinor(u64, u64),
    /// 1.0.0 - 2.0.0 means >=1.0.0 <=2.0.0
    Hyphen { from: Version, to: Version },
}

const OPERATORS: [&str; 7] = [">=", "<=", ">", "<", "=", "^", "~"];

impl VersionRange {
    /// Parse a range expression; `None` when any part is not a version
    pub fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Some(Self {
                sets: vec![vec![Comparator::Any]],
            });
        }

        let sets = spec
            .split("||")
            .map(|part| parse_set(part.trim()))
            .collect::<Option<Vec<_>>>()?;

        Some(Self { sets })
    }

    /// Check whether `version` falls inside the range
    ///
    /// Prerelease versions only match when `include_prerelease` is set or
    /// when a comparator in the same set names a prerelease on the same
    /// `major.minor.patch` tuple.
    pub fn satisfies(&self, version: &Version, include_prerelease: bool) -> bool {
        self.sets.iter().any(|set| {
            if !set.iter().all(|c| c.satisfies(version)) {
                return false;
            }
            if version.pre.is_empty() || include_prerelease {
                return true;
            }
            set.iter().any(|c| {
                c.base_version().is_some_and(|base| {
                    !base.pre.is_empty()
                        && base.major == version.major
                        && base.minor == version.minor
                        && base.patch == version.patch
                })
            })
        })
    }

    /// Lowest version that satisfies the range
    pub fn min_version(&self) -> Option<Version> {
        self.sets
            .iter()
            .filter_map(|set| {
                let low = set.iter().map(Comparator::lower_bound).max()?;
                set.iter().all(|c| c.satisfies(&low)).then_some(low)
            })
            .min()
    }
}

fn parse_set(spec: &str) -> Option<Vec<Comparator>> {
    if spec.is_empty() {
        return Some(vec![Comparator::Any]);
    }

    let tokens = tokenize(spec);

    if let [from, dash, to] = tokens.as_slice()
        && dash == "-"
    {
        let from = parse_partial(from)?.padded();
        let to = parse_partial(to)?.padded();
        return Some(vec![Comparator::Hyphen { from, to }]);
    }

    tokens.iter().map(|t| Comparator::parse(t)).collect()
}

/// Split on whitespace, gluing dangling operators to the following version
/// so `>= 1.2.3` reads the same as `>=1.2.3`
fn tokenize(spec: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut pending: Option<String> = None;

    for word in spec.split_whitespace() {
        match pending.take() {
            Some(op) => tokens.push(format!("{op}{word}")),
            None if OPERATORS.contains(&word) => pending = Some(word.to_string()),
            None => tokens.push(word.to_string()),
        }
    }
    if let Some(op) = pending {
        tokens.push(op);
    }
    tokens
}

/// A version with possibly missing trailing components (`1`, `1.2`, `1.x`)
#[derive(Debug)]
struct Partial {
    version: Version,
    /// Number of components actually written (0..=3)
    specified: usize,
}

impl Partial {
    fn padded(self) -> Version {
        self.version
    }
}

fn parse_partial(text: &str) -> Option<Partial> {
    let text = text.trim();
    let text = text.strip_prefix('=').unwrap_or(text);
    let text = text.strip_prefix('v').unwrap_or(text).trim();

    if let Ok(version) = Version::parse(text) {
        return Some(Partial {
            version,
            specified: 3,
        });
    }

    let parts: Vec<&str> = text.split('.').collect();
    if parts.len() > 3 {
        return None;
    }

    let mut numbers = Vec::with_capacity(3);
    for part in parts {
        if matches!(part, "x" | "X" | "*" | "") {
            break;
        }
        numbers.push(part.parse::<u64>().ok()?);
    }

    let specified = numbers.len();
    numbers.resize(3, 0);
    Some(Partial {
        version: Version::new(numbers[0], numbers[1], numbers[2]),
        specified,
    })
}

impl Comparator {
    fn parse(token: &str) -> Option<Self> {
        if let Some(rest) = token.strip_prefix(">=") {
            parse_partial(rest).map(|p| match p.specified {
                0 => Comparator::Any,
                _ => Comparator::Gte(p.padded()),
            })
        } else if let Some(rest) = token.strip_prefix("<=") {
            parse_partial(rest).map(|p| Comparator::Lte(p.padded()))
        } else if let Some(rest) = token.strip_prefix('>') {
            parse_partial(rest).map(|p| Comparator::Gt(p.padded()))
        } else if let Some(rest) = token.strip_prefix('<') {
            parse_partial(rest).map(|p| Comparator::Lt(p.padded()))
        } else if let Some(rest) = token.strip_prefix('^') {
            parse_partial(rest).map(|p| {
                let (major, minor) = (p.version.major, p.version.minor);
                match p.specified {
                    0 => Comparator::Any,
                    1 => Comparator::WildcardMajor(major),
                    2 if major == 0 => Comparator::WildcardMinor(0, minor),
                    _ => Comparator::Caret(p.padded()),
                }
            })
        } else if let Some(rest) = token.strip_prefix('~') {
            let rest = rest.strip_prefix('>').unwrap_or(rest);
            parse_partial(rest).map(|p| match p.specified {
                0 => Comparator::Any,
                1 => Comparator::WildcardMajor(p.version.major),
                _ => Comparator::Tilde(p.padded()),
            })
        } else {
            parse_partial(token).map(|p| match p.specified {
                0 => Comparator::Any,
                1 => Comparator::WildcardMajor(p.version.major),
                2 => Comparator::WildcardMinor(p.version.major, p.version.minor),
                _ => Comparator::Exact(p.padded()),
            })
        }
    }

    fn satisfies(&self, version: &Version) -> bool {
        match self {
            Comparator::Exact(v) => version == v,
            Comparator::Caret(v) => {
                if version < v {
                    return false;
                }
                // ^0.2.3 -> >=0.2.3 <0.3.0, ^0.0.3 -> >=0.0.3 <0.0.4
                if v.major == 0 {
                    if v.minor == 0 {
                        version.major == 0 && version.minor == 0 && version.patch == v.patch
                    } else {
                        version.major == 0 && version.minor == v.minor
                    }
                } else {
                    version.major == v.major
                }
            }
            Comparator::Tilde(v) => {
                version >= v && version.major == v.major && version.minor == v.minor
            }
            Comparator::Gte(v) => version >= v,
            Comparator::Gt(v) => version > v,
            Comparator::Lte(v) => version <= v,
            Comparator::Lt(v) => version < v,
            Comparator::Any => true,
            Comparator::WildcardMajor(major) => version.major == *major,
            Comparator::WildcardMinor(major, minor) => {
                version.major == *major && version.minor == *minor
            }
            Comparator::Hyphen { from, to } => version >= from && version <= to,
        }
    }

    /// Version this comparator is anchored on, if it names one
    fn base_version(&self) -> Option<&Version> {
        match self {
            Comparator::Exact(v)
            | Comparator::Caret(v)
            | Comparator::Tilde(v)
            | Comparator::Gte(v)
            | Comparator::Gt(v)
            | Comparator::Lte(v)
            | Comparator::Lt(v) => Some(v),
            Comparator::Hyphen { from, .. } => Some(from),
            Comparator::Any | Comparator::WildcardMajor(_) | Comparator::WildcardMinor(..) => None,
        }
    }

    fn lower_bound(&self) -> Version {
        match self {
            Comparator::Exact(v)
            | Comparator::Caret(v)
            | Comparator::Tilde(v)
            | Comparator::Gte(v) => v.clone(),
            Comparator::Hyphen { from, .. } => from.clone(),
            Comparator::Gt(v) => {
                let mut next = v.clone();
                if v.pre.is_empty() {
                    next.patch += 1;
                } else if let Ok(pre) = Prerelease::new(&format!("{}.0", v.pre)) {
                    next.pre = pre;
                }
                next
            }
            Comparator::Lte(_) | Comparator::Lt(_) | Comparator::Any => Version::new(0, 0, 0),
            Comparator::WildcardMajor(major) => Version::new(*major, 0, 0),
            Comparator::WildcardMinor(major, minor) => Version::new(*major, *minor, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn satisfies(range: &str, version: &str) -> bool {
        let range = VersionRange::parse(range).unwrap();
        range.satisfies(&Version::parse(version).unwrap(), false)
    }

    #[rstest]
    #[case("1.0.0", "1.0.0", true)]
    #[case("1.0.0", "1.0.1", false)]
    #[case("=1.0.0", "1.0.0", true)]
    #[case("v1.0.0", "1.0.0", true)]
    #[case("^1.2.3", "1.9.9", true)]
    #[case("^1.2.3", "1.2.2", false)]
    #[case("^1.2.3", "2.0.0", false)]
    #[case("^0.2.3", "0.2.9", true)]
    #[case("^0.2.3", "0.3.0", false)]
    #[case("^0.0.3", "0.0.3", true)]
    #[case("^0.0.3", "0.0.4", false)]
    #[case("~1.2.3", "1.2.9", true)]
    #[case("~1.2.3", "1.3.0", false)]
    #[case(">=1.0.0", "2.0.0", true)]
    #[case(">=1.0.0", "0.9.9", false)]
    #[case(">1.0.0", "1.0.0", false)]
    #[case("<=1.0.0", "1.0.0", true)]
    #[case("<1.0.0", "1.0.0", false)]
    fn satisfies_simple_ranges(#[case] range: &str, #[case] version: &str, #[case] expected: bool) {
        assert_eq!(satisfies(range, version), expected);
    }

    #[rstest]
    #[case("*", "999.0.0", true)]
    #[case("", "0.0.1", true)]
    #[case("x", "3.1.4", true)]
    #[case("1.x", "1.9.9", true)]
    #[case("1.x", "2.0.0", false)]
    #[case("1.X", "1.5.0", true)]
    #[case("1.x.x", "1.5.0", true)]
    #[case("1.2.x", "1.2.9", true)]
    #[case("1.2.*", "1.2.9", true)]
    #[case("1.2.x", "1.3.0", false)]
    #[case("1", "1.4.0", true)]
    #[case("1.2", "1.2.7", true)]
    #[case("1.2", "1.3.0", false)]
    #[case("^1", "1.9.0", true)]
    #[case("^0.14", "0.14.5", true)]
    #[case("^0.14", "0.15.0", false)]
    #[case("~1", "1.9.0", true)]
    #[case("~1.2", "1.3.0", false)]
    fn satisfies_wildcards_and_partials(
        #[case] range: &str,
        #[case] version: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(satisfies(range, version), expected);
    }

    #[rstest]
    #[case(">=1.0.0 <2.0.0", "1.5.0", true)]
    #[case(">=1.0.0 <2.0.0", "2.0.0", false)]
    #[case(">= 1.0.0 < 2.0.0", "1.5.0", true)]
    #[case("^1.0.0 || ^2.0.0", "2.5.0", true)]
    #[case("^1.0.0 || ^2.0.0", "3.0.0", false)]
    #[case("1.0.0 - 2.0.0", "2.0.0", true)]
    #[case("1.0.0 - 2.0.0", "2.0.1", false)]
    fn satisfies_compound_ranges(
        #[case] range: &str,
        #[case] version: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(satisfies(range, version), expected);
    }

    #[rstest]
    #[case("^1.0.0", "1.1.0-beta.1", false)]
    #[case("^1.1.0-beta.0", "1.1.0-beta.1", true)]
    #[case("^1.1.0-beta.0", "1.2.0-beta.1", false)]
    #[case("*", "2.0.0-rc.1", false)]
    fn prerelease_requires_matching_tuple(
        #[case] range: &str,
        #[case] version: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(satisfies(range, version), expected);
    }

    #[test]
    fn include_prerelease_admits_any_prerelease_in_bounds() {
        let range = VersionRange::parse("^1.0.0").unwrap();
        let version = Version::parse("1.1.0-beta.1").unwrap();
        assert!(range.satisfies(&version, true));
    }

    #[rstest]
    #[case("^1.2.3", Some("1.2.3"))]
    #[case("~1.2", Some("1.2.0"))]
    #[case("1.x", Some("1.0.0"))]
    #[case(">1.2.3", Some("1.2.4"))]
    #[case(">=1.2.3 <2.0.0", Some("1.2.3"))]
    #[case("<2.0.0", Some("0.0.0"))]
    #[case("*", Some("0.0.0"))]
    #[case("^2.0.0 || ^1.0.0", Some("1.0.0"))]
    #[case(">=2.0.0 <1.0.0", None)]
    fn min_version_returns_lowest_match(#[case] range: &str, #[case] expected: Option<&str>) {
        let range = VersionRange::parse(range).unwrap();
        assert_eq!(
            range.min_version(),
            expected.map(|v| Version::parse(v).unwrap())
        );
    }

    #[rstest]
    #[case("latest")]
    #[case("^abc")]
    #[case("1.2.3.4")]
    #[case(">=1.0.0 || foo")]
    fn parse_rejects_non_versions(#[case] range: &str) {
        assert_eq!(VersionRange::parse(range), None);
    }
}
