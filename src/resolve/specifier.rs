//! Classification of version specifiers and dependency names
//!
//! Decides which specifiers can never be updated (local paths, URLs,
//! workspace references), unwraps aliased specifiers to the package they
//! point at, and reduces composite override keys to a package name.

/// Protocol prefixes pointing at something other than a registry version
const LOCAL_PROTOCOLS: [&str; 6] = ["link:", "file:", "portal:", "workspace:", "catalog:", "patch:"];

/// Prefixes of git hosting shorthands and git URLs
const GIT_PREFIXES: [&str; 5] = ["git+", "git:", "github:", "gitlab:", "bitbucket:"];

const PATH_PREFIXES: [&str; 4] = ["./", "../", "/", "~/"];

/// True when a specifier refers to a local, linked, URL or workspace target
pub fn is_special(specifier: &str) -> bool {
    let specifier = specifier.trim();

    LOCAL_PROTOCOLS.iter().any(|p| specifier.starts_with(p))
        || PATH_PREFIXES.iter().any(|p| specifier.starts_with(p))
        || GIT_PREFIXES.iter().any(|p| specifier.starts_with(p))
        || specifier.contains("://")
        || is_github_shorthand(specifier)
}

/// `user/repo` or `user/repo#ref`
fn is_github_shorthand(specifier: &str) -> bool {
    !specifier.starts_with('@') && !specifier.contains(':') && specifier.contains('/')
}

/// Registry protocol used by an aliased specifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasProtocol {
    /// `npm:name@version`
    Npm,
    /// `jsr:@scope/name@version`
    Jsr,
}

impl AliasProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            AliasProtocol::Npm => "npm:",
            AliasProtocol::Jsr => "jsr:",
        }
    }
}

/// An aliased specifier such as `npm:real-pkg@^1.0.0`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub protocol: AliasProtocol,
    /// Package name as written after the protocol
    pub name: String,
    /// Range written after the package name (empty when omitted)
    pub version: String,
}

impl Alias {
    /// Parse an aliased specifier; `None` for anything else
    pub fn parse(specifier: &str) -> Option<Self> {
        let specifier = specifier.trim();
        let (protocol, rest) = if let Some(rest) = specifier.strip_prefix("npm:") {
            (AliasProtocol::Npm, rest)
        } else if let Some(rest) = specifier.strip_prefix("jsr:") {
            (AliasProtocol::Jsr, rest)
        } else {
            return None;
        };

        let (name, version) = split_name_version(rest);
        if name.is_empty() {
            return None;
        }
        // JSR packages are always scoped
        if protocol == AliasProtocol::Jsr && !(name.starts_with('@') && name.contains('/')) {
            return None;
        }

        Some(Self {
            protocol,
            name: name.to_string(),
            version: version.to_string(),
        })
    }

    /// Name to request from the registry
    ///
    /// JSR packages are served through the npm compatibility registry as
    /// `@jsr/<scope>__<name>`.
    pub fn registry_name(&self) -> String {
        match self.protocol {
            AliasProtocol::Npm => self.name.clone(),
            AliasProtocol::Jsr => {
                let unscoped = self.name.trim_start_matches('@');
                format!("@jsr/{}", unscoped.replacen('/', "__", 1))
            }
        }
    }

    /// Re-wrap a new range in the alias form
    pub fn with_version(&self, version: &str) -> String {
        format!("{}{}@{}", self.protocol.as_str(), self.name, version)
    }
}

/// Split `name@version`, keeping the leading `@` of scoped names
fn split_name_version(text: &str) -> (&str, &str) {
    match text.get(1..).and_then(|rest| rest.find('@')) {
        Some(pos) => (&text[..pos + 1], &text[pos + 2..]),
        None => (text, ""),
    }
}

/// Reduce a manifest key to the package it names
///
/// pnpm overrides use `a>b` and yarn resolutions use `a/b` (or `**/b`) to
/// target a nested dependency; the last segment is the package. A trailing
/// `@range` selector (`foo@1`) is dropped.
pub fn package_name(key: &str) -> &str {
    let key = key.rsplit('>').next().unwrap_or(key).trim();

    let segments: Vec<&str> = key.split('/').collect();
    let name = match segments.as_slice() {
        [] => key,
        [single] => *single,
        [.., scope, last] if scope.starts_with('@') => {
            let start = key.len() - last.len() - scope.len() - 1;
            &key[start..]
        }
        [.., last] => *last,
    };

    split_name_version(name).0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("link:../shared", true)]
    #[case("file:./vendor/pkg.tgz", true)]
    #[case("portal:../portal", true)]
    #[case("workspace:*", true)]
    #[case("workspace:^1.0.0", true)]
    #[case("catalog:", true)]
    #[case("catalog:react18", true)]
    #[case("patch:lodash@4.17.21#./patches/lodash.patch", true)]
    #[case("./local", true)]
    #[case("../sibling", true)]
    #[case("/abs/path", true)]
    #[case("~/home/pkg", true)]
    #[case("git+https://github.com/user/repo.git", true)]
    #[case("git://github.com/user/repo.git", true)]
    #[case("https://example.com/pkg.tgz", true)]
    #[case("github:user/repo", true)]
    #[case("user/repo", true)]
    #[case("user/repo#v1.0.0", true)]
    #[case("^1.2.3", false)]
    #[case("~1.2.3", false)]
    #[case("1.x", false)]
    #[case("*", false)]
    #[case("latest", false)]
    #[case("npm:real-pkg@^1.0.0", false)]
    #[case("npm:@scope/pkg@^1.0.0", false)]
    #[case(">=1.0.0 <2.0.0", false)]
    fn is_special_detects_non_registry_targets(#[case] specifier: &str, #[case] expected: bool) {
        assert_eq!(is_special(specifier), expected);
    }

    #[rstest]
    #[case("npm:real-pkg@^1.0.0", AliasProtocol::Npm, "real-pkg", "^1.0.0")]
    #[case("npm:@scope/pkg@~2.1.0", AliasProtocol::Npm, "@scope/pkg", "~2.1.0")]
    #[case("npm:real-pkg", AliasProtocol::Npm, "real-pkg", "")]
    #[case("jsr:@std/path@^1.0.0", AliasProtocol::Jsr, "@std/path", "^1.0.0")]
    fn alias_parse_splits_name_and_version(
        #[case] specifier: &str,
        #[case] protocol: AliasProtocol,
        #[case] name: &str,
        #[case] version: &str,
    ) {
        let alias = Alias::parse(specifier).unwrap();
        assert_eq!(alias.protocol, protocol);
        assert_eq!(alias.name, name);
        assert_eq!(alias.version, version);
    }

    #[rstest]
    #[case("^1.0.0")]
    #[case("jsr:path@1.0.0")]
    #[case("npm:")]
    fn alias_parse_rejects_non_aliases(#[case] specifier: &str) {
        assert_eq!(Alias::parse(specifier), None);
    }

    #[rstest]
    #[case("npm:real-pkg@^1.0.0", "real-pkg")]
    #[case("npm:@scope/pkg@^1.0.0", "@scope/pkg")]
    #[case("jsr:@std/path@^1.0.0", "@jsr/std__path")]
    fn alias_registry_name(#[case] specifier: &str, #[case] expected: &str) {
        assert_eq!(Alias::parse(specifier).unwrap().registry_name(), expected);
    }

    #[test]
    fn alias_with_version_keeps_alias_form() {
        let alias = Alias::parse("npm:real-pkg@^1.0.0").unwrap();
        assert_eq!(alias.with_version("^1.2.0"), "npm:real-pkg@^1.2.0");
    }

    #[rstest]
    #[case("lodash", "lodash")]
    #[case("@types/node", "@types/node")]
    #[case("a/b", "b")]
    #[case("**/b", "b")]
    #[case("a/@scope/b", "@scope/b")]
    #[case("**/@types/node", "@types/node")]
    #[case("foo>bar", "bar")]
    #[case("foo@1>@scope/bar", "@scope/bar")]
    #[case("foo@^1.0.0", "foo")]
    #[case("@scope/foo@2", "@scope/foo")]
    fn package_name_reduces_composite_keys(#[case] key: &str, #[case] expected: &str) {
        assert_eq!(package_name(key), expected);
    }
}
