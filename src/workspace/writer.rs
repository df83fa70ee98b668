//! In-place manifest rewriting
//!
//! Targets are spliced into the original text at the byte offsets recorded
//! by the parsers, so formatting, comments and key order are untouched.

use tracing::warn;

use crate::resolve::dependency::ResolvedDependency;

/// Apply every `will_update` target to `content`
///
/// Spans are replaced from the end of the file backwards so earlier offsets
/// stay valid. Spans that overlap or fall outside the text are skipped.
pub fn apply_updates(content: &str, deps: &[ResolvedDependency]) -> String {
    let mut updates: Vec<&ResolvedDependency> = deps.iter().filter(|d| d.will_update).collect();
    updates.sort_by(|a, b| b.raw.start_offset.cmp(&a.raw.start_offset));

    let mut output = content.to_string();
    let mut limit = content.len();

    for dep in updates {
        let (start, end) = (dep.raw.start_offset, dep.raw.end_offset);
        if start > end || end > limit || content.get(start..end).is_none() {
            warn!(
                "Skipping {}: span {}..{} is not writable",
                dep.raw.name, start, end
            );
            continue;
        }

        output.replace_range(start..end, &dep.target_version);
        limit = start;
    }

    output
}

/// Count the updates that [`apply_updates`] would write
pub fn pending_updates(deps: &[ResolvedDependency]) -> usize {
    deps.iter().filter(|d| d.will_update).count()
}
