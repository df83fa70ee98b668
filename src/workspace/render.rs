//! Plain-text report rendering

use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::resolve::dependency::ResolvedDependency;
use crate::workspace::ManifestReport;

/// Short human age, e.g. `3d`, `5mo`, `2y`
pub fn format_age(time: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let days = (now - time).num_days().max(0);
    match days {
        0 => "today".to_string(),
        1..=29 => format!("{days}d"),
        30..=364 => format!("{}mo", days / 30),
        _ => format!("{}y", days / 365),
    }
}

fn status(dep: &ResolvedDependency, now: DateTime<Utc>) -> String {
    if let Some(error) = &dep.resolve_error {
        return format!("{} ({})", error.label(), error);
    }

    let mut status = format!(
        "{}  ->  {}  {}",
        dep.raw.current_version, dep.target_version, dep.diff
    );
    if let Some(time) = dep.target_version_time {
        let _ = write!(status, "  {}", format_age(time, now));
    }
    if let Some(latest) = &dep.latest_version_available {
        let _ = write!(status, "  (latest {latest})");
    }
    status
}

fn is_shown(dep: &ResolvedDependency, show_all: bool) -> bool {
    show_all || dep.will_update || dep.resolve_error.is_some()
}

/// Render one section per manifest
///
/// Up-to-date dependencies are listed only with `show_all`. Errors are
/// always listed, labeled by kind.
pub fn render_report(reports: &[ManifestReport], show_all: bool, now: DateTime<Utc>) -> String {
    let mut out = String::new();

    for report in reports {
        let _ = writeln!(out, "{}", report.path.display());

        if let Some(error) = &report.load_error {
            let _ = writeln!(out, "  failed to load: {error}");
            continue;
        }

        let shown: Vec<&ResolvedDependency> = report
            .dependencies
            .iter()
            .filter(|dep| is_shown(dep, show_all))
            .collect();

        if shown.is_empty() {
            let _ = writeln!(out, "  all dependencies are up to date");
            continue;
        }

        let name_width = shown.iter().map(|d| display_name(d).len()).max().unwrap_or(0);
        let field_width = shown
            .iter()
            .map(|d| d.raw.source.as_str().len())
            .max()
            .unwrap_or(0);

        for dep in shown {
            let _ = writeln!(
                out,
                "  {:name_width$}  {:field_width$}  {}",
                display_name(dep),
                dep.raw.source.as_str(),
                status(dep, now),
            );
        }

        if report.written {
            let _ = writeln!(out, "  written");
        }
    }

    out
}

/// Name qualified by its override parents or catalog name
fn display_name(dep: &ResolvedDependency) -> String {
    if dep.raw.parents.is_empty() {
        dep.raw.name.clone()
    } else {
        format!("{} > {}", dep.raw.parents.join(" > "), dep.raw.name)
    }
}

/// One-line summary after all manifests
pub fn render_summary(reports: &[ManifestReport], write: bool) -> String {
    let updates: usize = reports
        .iter()
        .map(|r| crate::workspace::writer::pending_updates(&r.dependencies))
        .sum();

    match (updates, write) {
        (0, _) => "Everything is up to date.".to_string(),
        (n, true) => format!("{n} update(s) written."),
        (n, false) => format!("{n} update(s) available. Run with --write to apply."),
    }
}
