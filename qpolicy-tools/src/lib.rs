//! # qpolicy-tools
//!
//! Command-style qrexec policy routines and the adapter that lets them run
//! in-process.
//!
//! The routines in [`lint`] and [`editor`] behave like standalone commands:
//! they read [`stdio::stdin`], print to [`stdio::stdout`] and fail by
//! returning a [`ToolExit`]. Wrap every call in a [`ToolContext`] to get an
//! ordinary [`ToolError`] back instead.

pub mod context;
pub mod editor;
pub mod error;
pub mod lint;
pub mod stdio;

pub use context::ToolContext;
pub use error::{ToolError, ToolExit, FAILURE_STATUS};
