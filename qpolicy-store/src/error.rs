use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use qpolicy_tools::ToolError;

/// Store client operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    Get,
    Replace,
    Remove,
    List,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreOperation::Get => write!(f, "get"),
            StoreOperation::Replace => write!(f, "replace"),
            StoreOperation::Remove => write!(f, "remove"),
            StoreOperation::List => write!(f, "list"),
        }
    }
}

/// What the store's diagnostic says went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// The policy does not exist.
    NotFound,
    /// The concurrency token no longer matches the stored document.
    Conflict,
    /// Transport fault or any other refusal.
    Failed,
}

/// A remote store call failed.
#[derive(Debug, Error)]
#[error("error during client method '{operation}': {}", .source.to_string().trim_end())]
pub struct StoreError {
    pub operation: StoreOperation,
    pub kind: StoreErrorKind,
    #[source]
    pub source: ToolError,
}

impl StoreError {
    pub fn new(operation: StoreOperation, source: ToolError) -> Self {
        Self {
            operation,
            kind: classify(source.message()),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == StoreErrorKind::NotFound
    }

    pub fn is_conflict(&self) -> bool {
        self.kind == StoreErrorKind::Conflict
    }
}

fn classify(message: &str) -> StoreErrorKind {
    let lower = message.to_ascii_lowercase();
    if lower.contains("not found") {
        StoreErrorKind::NotFound
    } else if lower.contains("token mismatch")
        || lower.contains("token is \"new\"")
        || lower.contains("token is not \"new\"")
    {
        StoreErrorKind::Conflict
    } else {
        StoreErrorKind::Failed
    }
}

/// Errors loading a [`crate::StoreConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse store config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
