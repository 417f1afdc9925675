//! Reconcile engine.
//!
//! ## `present` — protocol
//!
//! 1. Read the desired content from its source.
//! 2. Lint it. Nothing touches the store before this passes.
//! 3. `get` the current document. Not-found reads as empty content with the
//!    `new` token; any other failure aborts.
//! 4. Check mode, or content byte-for-byte equal: unchanged.
//! 5. Otherwise `replace` with the token from step 3.
//!
//! ## `absent` — protocol
//!
//! 1. `list` the namespace to learn the state before.
//! 2. Check mode: unchanged.
//! 3. Otherwise `remove`. Not-found is an unchanged outcome; any other
//!    failure aborts.

use std::path::PathBuf;

use qpolicy_core::{lint, ConcurrencyToken, PolicyName, PolicyState};
use qpolicy_store::{PolicyAdmin, PolicyStore};

use crate::error::{io_err, ReconcileError};
use crate::result::{state_text, DiffEntry, ReconcileResult};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Where the desired content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    Inline(String),
    File(PathBuf),
}

impl ContentSource {
    pub fn read(&self) -> Result<String, ReconcileError> {
        match self {
            ContentSource::Inline(content) => Ok(content.clone()),
            ContentSource::File(path) => {
                std::fs::read_to_string(path).map_err(|e| io_err(path, e))
            }
        }
    }
}

/// Run-mode switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Compute the outcome without any mutating store call.
    pub check_mode: bool,
    /// Attach before/after [`DiffEntry`]s to the result.
    pub diff: bool,
}

/// Declared target of a reconcile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesiredState {
    Present(ContentSource),
    Absent,
}

impl DesiredState {
    pub fn state(&self) -> PolicyState {
        match self {
            DesiredState::Present(_) => PolicyState::Present,
            DesiredState::Absent => PolicyState::Absent,
        }
    }
}

// ---------------------------------------------------------------------------
// PolicyReconciler
// ---------------------------------------------------------------------------

/// Converges one named policy document.
pub struct PolicyReconciler<'a, A: PolicyAdmin + ?Sized> {
    store: PolicyStore<'a, A>,
    options: ReconcileOptions,
}

impl<'a, A: PolicyAdmin + ?Sized> PolicyReconciler<'a, A> {
    /// Validate `raw_name` and bind to it. No store call is made.
    pub fn new(admin: &'a A, raw_name: &str, options: ReconcileOptions) -> Result<Self, ReconcileError> {
        Ok(Self {
            store: PolicyStore::open(admin, raw_name)?,
            options,
        })
    }

    pub fn name(&self) -> &PolicyName {
        self.store.name()
    }

    pub fn run(&self, desired: &DesiredState) -> Result<ReconcileResult, ReconcileError> {
        match desired {
            DesiredState::Present(source) => self.present(source),
            DesiredState::Absent => self.absent(),
        }
    }

    pub fn present(&self, source: &ContentSource) -> Result<ReconcileResult, ReconcileError> {
        let desired = source.read()?;
        lint(&desired, self.store.is_include())?;

        let (current, token) = match self.store.get() {
            Ok(doc) => (doc.content, doc.token),
            Err(err) if err.is_not_found() => {
                tracing::debug!(name = %self.name(), "policy not found, treating as new");
                (String::new(), ConcurrencyToken::new_document())
            }
            Err(err) => return Err(err.into()),
        };

        // An empty document is never created: "" equals the not-found content.
        let changed = if current == desired {
            false
        } else if self.options.check_mode {
            tracing::info!(name = %self.name(), "check mode, policy would be written");
            false
        } else {
            self.store.replace(&desired, &token)?;
            tracing::info!(name = %self.name(), new = token.is_new(), "policy written");
            true
        };

        let is_new = token.is_new();
        let before_state = if is_new {
            PolicyState::Absent
        } else {
            PolicyState::Present
        };
        let after_state = if changed {
            PolicyState::Present
        } else {
            before_state
        };

        let diff = if self.options.diff {
            vec![
                DiffEntry::state(self.name(), before_state, after_state),
                DiffEntry::tagged(self.name(), "content", current.clone(), desired.clone()),
            ]
        } else {
            Vec::new()
        };

        Ok(ReconcileResult {
            changed,
            name: self.name().clone(),
            is_include: self.store.is_include(),
            state: PolicyState::Present,
            is_new: Some(is_new),
            content: Some(desired.clone()),
            before: current,
            after: desired,
            diff,
        })
    }

    pub fn absent(&self) -> Result<ReconcileResult, ReconcileError> {
        let listed = match self.store.list() {
            Ok(names) => names,
            Err(err) if err.is_not_found() => Default::default(),
            Err(err) => return Err(err.into()),
        };
        let before_state = if listed.contains(self.name()) {
            PolicyState::Present
        } else {
            PolicyState::Absent
        };

        let changed = if self.options.check_mode {
            tracing::info!(name = %self.name(), "check mode, policy would be removed");
            false
        } else {
            match self.store.remove() {
                Ok(()) => {
                    tracing::info!(name = %self.name(), "policy removed");
                    true
                }
                Err(err) if err.is_not_found() => false,
                Err(err) => return Err(err.into()),
            }
        };

        let after_state = if changed {
            PolicyState::Absent
        } else {
            before_state
        };

        let diff = if self.options.diff {
            vec![DiffEntry::state(self.name(), before_state, after_state)]
        } else {
            Vec::new()
        };

        Ok(ReconcileResult {
            changed,
            name: self.name().clone(),
            is_include: self.store.is_include(),
            state: PolicyState::Absent,
            is_new: None,
            content: None,
            before: state_text(before_state),
            after: state_text(after_state),
            diff,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
