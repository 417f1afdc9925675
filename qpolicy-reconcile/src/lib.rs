//! # qpolicy-reconcile
//!
//! Convergence of one policy document toward a desired state.
//!
//! Build a [`PolicyReconciler`] for a name, then call
//! [`PolicyReconciler::present`] or [`PolicyReconciler::absent`] (or
//! [`PolicyReconciler::run`] with a [`DesiredState`]).

pub mod diff;
pub mod engine;
pub mod error;
pub mod result;

pub use diff::render_unified;
pub use engine::{ContentSource, DesiredState, PolicyReconciler, ReconcileOptions};
pub use error::ReconcileError;
pub use result::{DiffEntry, ReconcileResult};
