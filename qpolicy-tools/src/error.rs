//! Error types for qpolicy-tools.

use std::io::Write;

use thiserror::Error;

/// Exit status a command-style routine uses to report "input rejected".
pub const FAILURE_STATUS: i32 = 1;

/// Exit status for I/O failures inside a routine (`EX_IOERR`).
pub const IO_ERROR_STATUS: i32 = 74;

/// The ways a command-style routine stops instead of returning a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolExit {
    /// The routine terminated the (virtual) process with this status.
    Exit(i32),
    /// An external command run by the routine exited unsuccessfully.
    CommandFailed {
        /// `None` when the command could not be started or was killed by a signal.
        status: Option<i32>,
        stderr: Vec<u8>,
    },
}

impl ToolExit {
    /// `Exit(FAILURE_STATUS)`.
    pub fn failure() -> Self {
        ToolExit::Exit(FAILURE_STATUS)
    }

    pub fn command_failed(status: Option<i32>, stderr: impl Into<Vec<u8>>) -> Self {
        ToolExit::CommandFailed {
            status,
            stderr: stderr.into(),
        }
    }
}

/// Reports the error on the routine's stdout, then exits with
/// [`IO_ERROR_STATUS`].
impl From<std::io::Error> for ToolExit {
    fn from(err: std::io::Error) -> Self {
        let _ = writeln!(crate::stdio::stdout(), "{err}");
        ToolExit::Exit(IO_ERROR_STATUS)
    }
}

/// A routine failure translated by [`crate::ToolContext`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    /// The routine rejected its input. `message` is its captured output, or
    /// the trimmed stderr of the external command that failed.
    #[error("{message}")]
    Failed { message: String },

    /// The routine exited with a status other than [`FAILURE_STATUS`].
    #[error("tool exited with status {code}: {output}")]
    Exited { code: i32, output: String },

    /// A capture was requested while one is already active on this thread.
    #[error("stream capture is already active on this thread")]
    Reentrant,
}

impl ToolError {
    /// Diagnostic text carried by the error.
    pub fn message(&self) -> &str {
        match self {
            ToolError::Failed { message } => message,
            ToolError::Exited { output, .. } => output,
            ToolError::Reentrant => "",
        }
    }
}
