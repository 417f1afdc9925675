//! Unified diff rendering for `--diff` output.

use similar::TextDiff;

use crate::result::DiffEntry;

/// Render `entry` as a unified diff. Empty when both sides are equal.
pub fn render_unified(entry: &DiffEntry) -> String {
    if entry.before == entry.after {
        return String::new();
    }
    TextDiff::from_lines(&entry.before, &entry.after)
        .unified_diff()
        .header(&entry.before_header, &entry.after_header)
        .context_radius(3)
        .to_string()
}
