//! Scoped stream capture for command-style routines.
//!
//! ## `ToolContext::run` — capture protocol
//!
//! 1. Refuse to nest: a second capture on the same thread fails fast.
//! 2. Take the process-wide capture lock (held for the whole call).
//! 3. Install the preloaded input buffer and an empty output buffer.
//! 4. Run the routine.
//! 5. Restore the previous streams. The restore lives in a drop guard, so
//!    it also runs when the routine panics.
//! 6. Translate the routine's [`ToolExit`] into a [`ToolError`].

use std::cell::Cell;

use parking_lot::{const_mutex, Mutex};

use crate::error::{ToolError, ToolExit, FAILURE_STATUS};
use crate::stdio::{self, Streams};

static CAPTURE_LOCK: Mutex<()> = const_mutex(());

thread_local! {
    static ACTIVE: Cell<bool> = const { Cell::new(false) };
}

/// Runs a command-style routine as a function call.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    input: String,
}

impl ToolContext {
    /// A context whose stdin reads `input`.
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }

    /// Run `body` with redirected streams and translate how it stopped.
    ///
    /// Output written by a successful routine is discarded.
    pub fn run<T, F>(self, body: F) -> Result<T, ToolError>
    where
        F: FnOnce() -> Result<T, ToolExit>,
    {
        if ACTIVE.with(Cell::get) {
            return Err(ToolError::Reentrant);
        }

        let _lock = CAPTURE_LOCK.lock();
        let redirect = Redirect::install(self.input);
        tracing::debug!("tool streams captured");

        let outcome = body();
        let output = redirect.restore();
        tracing::debug!("tool streams restored");

        outcome.map_err(|exit| translate(exit, output))
    }
}

fn translate(exit: ToolExit, output: String) -> ToolError {
    match exit {
        ToolExit::Exit(FAILURE_STATUS) => ToolError::Failed { message: output },
        ToolExit::Exit(code) => ToolError::Exited { code, output },
        ToolExit::CommandFailed { stderr, .. } => ToolError::Failed {
            message: String::from_utf8_lossy(&stderr).trim_end().to_string(),
        },
    }
}

/// Installed redirection; puts the previous streams back exactly once.
struct Redirect {
    previous: Option<Option<Streams>>,
}

impl Redirect {
    fn install(input: String) -> Self {
        ACTIVE.with(|active| active.set(true));
        let previous = stdio::replace(Some(Streams::captured(input)));
        Self {
            previous: Some(previous),
        }
    }

    /// Restore and return what the routine printed.
    fn restore(mut self) -> String {
        self.release()
            .map(Streams::into_output)
            .unwrap_or_default()
    }

    fn release(&mut self) -> Option<Streams> {
        let previous = self.previous.take()?;
        let captured = stdio::replace(previous);
        ACTIVE.with(|active| active.set(false));
        captured
    }
}

impl Drop for Redirect {
    fn drop(&mut self) {
        self.release();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
