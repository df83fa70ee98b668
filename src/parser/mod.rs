//! Parser layer
//! - traits.rs: Parser trait definition
//! - types.rs: Common types (RawDependency, SourceField, ManifestKind)
//! - package_json.rs: package.json parser
//! - pnpm_workspace.rs: pnpm-workspace.yaml parser

pub mod package_json;
pub mod pnpm_workspace;
pub mod traits;
pub mod types;

pub use package_json::PackageJsonParser;
pub use pnpm_workspace::PnpmWorkspaceParser;
pub use traits::{ParseError, Parser};
pub use types::{ManifestKind, RawDependency, SourceField};

/// Parse a manifest with the parser matching its kind
pub fn parse_manifest(kind: ManifestKind, content: &str) -> Result<Vec<RawDependency>, ParseError> {
    match kind {
        ManifestKind::PackageJson => PackageJsonParser::new().parse(content),
        ManifestKind::PnpmWorkspace => PnpmWorkspaceParser.parse(content),
    }
}
