//! Error types for qpolicy-reconcile.

use std::path::PathBuf;

use thiserror::Error;

use qpolicy_core::{InvalidNameError, ValidationError};
use qpolicy_store::StoreError;

/// Everything that can stop a convergence attempt.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    InvalidName(#[from] InvalidNameError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Desired content could not be read from its file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ReconcileError {
    /// `true` when the store refused a write because the token was stale.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ReconcileError::Store(err) if err.is_conflict())
    }
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ReconcileError {
    ReconcileError::Io {
        path: path.into(),
        source,
    }
}
