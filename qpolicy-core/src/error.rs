//! Error types for qpolicy-core.

use thiserror::Error;

use qpolicy_tools::ToolError;

/// A policy name the name validator refused.
#[derive(Debug, Error)]
#[error("name validation failed: {}", .source.to_string().trim_end())]
pub struct InvalidNameError {
    /// The name as given by the caller.
    pub name: String,
    #[source]
    pub source: ToolError,
}

/// Policy content the linter refused.
#[derive(Debug, Error)]
#[error("lint failed: {}", .source.to_string().trim_end())]
pub struct ValidationError {
    #[source]
    pub source: ToolError,
}
