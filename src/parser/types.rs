//! Common types for parsers

use std::path::Path;

/// Manifest table a dependency entry was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceField {
    /// `dependencies`
    Dependencies,
    /// `devDependencies`
    DevDependencies,
    /// `peerDependencies`
    PeerDependencies,
    /// `optionalDependencies`
    OptionalDependencies,
    /// `packageManager` (pnpm@9.1.0)
    PackageManager,
    /// npm `overrides`
    Overrides,
    /// yarn `resolutions`
    Resolutions,
    /// `pnpm.overrides` in package.json or `overrides` in pnpm-workspace.yaml
    PnpmOverrides,
    /// `catalog` / `catalogs` in pnpm-workspace.yaml
    PnpmCatalog,
    /// `catalog` / `catalogs` in package.json (bun, yarn)
    Catalog,
}

impl SourceField {
    pub const ALL: [SourceField; 10] = [
        SourceField::Dependencies,
        SourceField::DevDependencies,
        SourceField::PeerDependencies,
        SourceField::OptionalDependencies,
        SourceField::PackageManager,
        SourceField::Overrides,
        SourceField::Resolutions,
        SourceField::PnpmOverrides,
        SourceField::PnpmCatalog,
        SourceField::Catalog,
    ];

    /// Returns the string representation of the source field
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceField::Dependencies => "dependencies",
            SourceField::DevDependencies => "devDependencies",
            SourceField::PeerDependencies => "peerDependencies",
            SourceField::OptionalDependencies => "optionalDependencies",
            SourceField::PackageManager => "packageManager",
            SourceField::Overrides => "overrides",
            SourceField::Resolutions => "resolutions",
            SourceField::PnpmOverrides => "pnpm.overrides",
            SourceField::PnpmCatalog => "pnpm.catalog",
            SourceField::Catalog => "catalog",
        }
    }
}

impl std::fmt::Display for SourceField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of manifest file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifestKind {
    /// package.json
    PackageJson,
    /// pnpm-workspace.yaml
    PnpmWorkspace,
}

impl ManifestKind {
    /// Detect the manifest kind from its file name
    pub fn detect(path: &Path) -> Option<Self> {
        match path.file_name()?.to_str()? {
            "package.json" => Some(ManifestKind::PackageJson),
            "pnpm-workspace.yaml" => Some(ManifestKind::PnpmWorkspace),
            _ => None,
        }
    }
}

/// One dependency entry as written in a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDependency {
    /// Key as written (e.g. "lodash", "@types/node", "a>b")
    pub name: String,
    /// Version specifier as written (e.g. "^1.2.3", "npm:pkg@^1.0.0")
    pub current_version: String,
    /// Table the entry was read from
    pub source: SourceField,
    /// Enclosing override keys, or the catalog name for named catalogs
    pub parents: Vec<String>,
    /// Whether the entry may be rewritten at all
    pub update: bool,
    /// Byte offset of the version string in the source (start)
    pub start_offset: usize,
    /// Byte offset of the version string in the source (end)
    pub end_offset: usize,
    /// Line number (0-indexed)
    pub line: usize,
    /// Column number (0-indexed)
    pub column: usize,
}
