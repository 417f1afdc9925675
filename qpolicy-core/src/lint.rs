//! Content validation — a hard precondition on every mutating path.

use qpolicy_tools::{lint::parse_file, lint::STDIN_PATH, ToolContext};

use crate::error::ValidationError;

/// Lint `content` as an ordinary policy, or as an include-service policy
/// when `is_include` is set.
pub fn lint(content: &str, is_include: bool) -> Result<(), ValidationError> {
    ToolContext::new(content)
        .run(|| parse_file(STDIN_PATH, true, is_include))
        .map_err(|source| ValidationError { source })?;
    tracing::debug!(is_include, bytes = content.len(), "policy content linted");
    Ok(())
}
