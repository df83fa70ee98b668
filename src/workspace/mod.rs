//! Workspace layer
//! - scan.rs: manifest discovery and loading
//! - writer.rs: in-place rewriting of resolved targets
//! - render.rs: plain-text report

pub mod render;
pub mod scan;
pub mod writer;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use futures::future::join_all;
use tracing::{info, warn};

use crate::parser::types::{ManifestKind, SourceField};
use crate::resolve::batch::{BatchOptions, resolve_all};
use crate::resolve::dependency::{DependencyResolver, ResolvedDependency};

pub use scan::{Manifest, find_manifests};

/// How a workspace run behaves
#[derive(Debug, Clone, Default)]
pub struct WorkspaceOptions {
    pub recursive: bool,
    pub write: bool,
    pub batch: BatchOptions,
    /// Tables whose entries are reported but never rewritten
    pub disabled_fields: HashSet<SourceField>,
}

/// Outcome for one manifest file
#[derive(Debug, Clone)]
pub struct ManifestReport {
    pub path: PathBuf,
    pub kind: Option<ManifestKind>,
    pub dependencies: Vec<ResolvedDependency>,
    /// Whether updated content was written back
    pub written: bool,
    /// Set when the file could not be read, parsed or written
    pub load_error: Option<String>,
}

impl ManifestReport {
    fn failed(path: PathBuf, error: &anyhow::Error) -> Self {
        Self {
            kind: ManifestKind::detect(&path),
            path,
            dependencies: Vec::new(),
            written: false,
            load_error: Some(format!("{error:#}")),
        }
    }
}

/// Resolve every manifest under `root`
///
/// Manifests are processed concurrently and share the resolver's fetcher,
/// so a package referenced from several files is fetched once. A manifest
/// that fails to load is reported and does not stop the others.
pub async fn resolve_workspace<F>(
    resolver: &DependencyResolver,
    root: &Path,
    options: &WorkspaceOptions,
    on_progress: F,
) -> Vec<ManifestReport>
where
    F: Fn(&Path, &str, usize, usize),
{
    let paths = find_manifests(root, options.recursive);
    let on_progress = &on_progress;

    join_all(paths.into_iter().map(|path| async move {
        match process_manifest(resolver, &path, options, on_progress).await {
            Ok(report) => report,
            Err(e) => {
                warn!("{e:#}");
                ManifestReport::failed(path, &e)
            }
        }
    }))
    .await
}

async fn process_manifest<F>(
    resolver: &DependencyResolver,
    path: &Path,
    options: &WorkspaceOptions,
    on_progress: &F,
) -> anyhow::Result<ManifestReport>
where
    F: Fn(&Path, &str, usize, usize),
{
    let mut manifest = Manifest::load(path)?;
    manifest.disable_fields(&options.disabled_fields);

    let Manifest {
        path,
        kind,
        content,
        dependencies,
    } = manifest;

    let dependencies = resolve_all(resolver, dependencies, options.batch, |name, done, total| {
        on_progress(&path, name, done, total)
    })
    .await;

    let mut written = false;
    if options.write && writer::pending_updates(&dependencies) > 0 {
        let updated = writer::apply_updates(&content, &dependencies);
        if updated != content {
            tokio::fs::write(&path, updated).await.map_err(|e| {
                anyhow::anyhow!("Failed to write {}: {}", path.display(), e)
            })?;
            info!("Updated {}", path.display());
            written = true;
        }
    }

    Ok(ManifestReport {
        path,
        kind: Some(kind),
        dependencies,
        written,
        load_error: None,
    })
}
