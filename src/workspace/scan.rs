//! Manifest discovery and loading

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::parser::types::{ManifestKind, RawDependency, SourceField};
use crate::parser::{ParseError, parse_manifest};

/// A manifest file read from disk and parsed
#[derive(Debug, Clone)]
pub struct Manifest {
    pub path: PathBuf,
    pub kind: ManifestKind,
    pub content: String,
    pub dependencies: Vec<RawDependency>,
}

impl Manifest {
    /// Parse already-read content
    pub fn parse(path: PathBuf, content: String) -> Result<Self, ParseError> {
        let kind = ManifestKind::detect(&path).ok_or_else(|| {
            ParseError::ParseFailed(format!("Unsupported manifest: {}", path.display()))
        })?;
        let dependencies = parse_manifest(kind, &content)?;

        Ok(Self {
            path,
            kind,
            content,
            dependencies,
        })
    }

    /// Read and parse a manifest
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(path.to_path_buf(), content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Mark entries from disabled tables as ineligible for updates
    pub fn disable_fields(&mut self, disabled: &HashSet<SourceField>) {
        for dep in &mut self.dependencies {
            if disabled.contains(&dep.source) {
                dep.update = false;
            }
        }
    }
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name == "node_modules" || name.starts_with('.'))
}

/// Find manifests under `root`
///
/// Without `recursive` only the root `package.json` is returned. A
/// `pnpm-workspace.yaml` is only picked up at the root. Paths are sorted.
pub fn find_manifests(root: &Path, recursive: bool) -> Vec<PathBuf> {
    let mut manifests = Vec::new();

    let workspace = root.join("pnpm-workspace.yaml");
    if workspace.is_file() {
        manifests.push(workspace);
    }

    if recursive {
        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| !is_skipped_dir(entry));

        for entry in walker.filter_map(Result::ok) {
            if entry.file_type().is_file() && entry.file_name() == "package.json" {
                manifests.push(entry.into_path());
            }
        }
    } else {
        let package_json = root.join("package.json");
        if package_json.is_file() {
            manifests.push(package_json);
        }
    }

    manifests.sort();
    debug!("Found {} manifests under {}", manifests.len(), root.display());
    manifests
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn relative(root: &Path, paths: Vec<PathBuf>) -> Vec<String> {
        paths
            .into_iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().into_owned())
            .collect()
    }

    fn workspace() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(root, "package.json", "{}");
        touch(root, "pnpm-workspace.yaml", "catalog: {}\n");
        touch(root, "packages/a/package.json", "{}");
        touch(root, "packages/b/package.json", "{}");
        touch(root, "packages/b/pnpm-workspace.yaml", "");
        touch(root, "node_modules/lodash/package.json", "{}");
        touch(root, ".cache/x/package.json", "{}");
        temp_dir
    }

    #[test]
    fn find_manifests_returns_root_only_by_default() {
        let temp_dir = workspace();
        let found = find_manifests(temp_dir.path(), false);

        assert_eq!(
            relative(temp_dir.path(), found),
            vec!["package.json", "pnpm-workspace.yaml"]
        );
    }

    #[test]
    fn find_manifests_recursive_skips_node_modules_and_hidden_dirs() {
        let temp_dir = workspace();
        let found = find_manifests(temp_dir.path(), true);

        assert_eq!(
            relative(temp_dir.path(), found),
            vec![
                "package.json",
                "packages/a/package.json",
                "packages/b/package.json",
                "pnpm-workspace.yaml",
            ]
        );
    }

    #[test]
    fn find_manifests_handles_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        assert!(find_manifests(temp_dir.path(), true).is_empty());
    }

    #[test]
    fn load_parses_dependencies() {
        let temp_dir = TempDir::new().unwrap();
        touch(
            temp_dir.path(),
            "package.json",
            r#"{ "dependencies": { "lodash": "^4.17.0" } }"#,
        );

        let manifest = Manifest::load(&temp_dir.path().join("package.json")).unwrap();

        assert_eq!(manifest.kind, ManifestKind::PackageJson);
        assert_eq!(manifest.dependencies.len(), 1);
        assert_eq!(manifest.dependencies[0].name, "lodash");
    }

    #[test]
    fn load_reports_structural_errors() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "package.json", "{ \"dependencies\": ");

        let error = Manifest::load(&temp_dir.path().join("package.json")).unwrap_err();

        assert!(error.to_string().starts_with("Failed to parse"));
    }

    #[test]
    fn disable_fields_marks_entries_ineligible() {
        let mut manifest = Manifest::parse(
            PathBuf::from("package.json"),
            r#"{
  "dependencies": { "a": "^1.0.0" },
  "peerDependencies": { "b": "^2.0.0" }
}"#
            .to_string(),
        )
        .unwrap();

        manifest.disable_fields(&HashSet::from([SourceField::PeerDependencies]));

        assert!(manifest.dependencies[0].update);
        assert!(!manifest.dependencies[1].update);
    }
}
