//! Outcome of one convergence attempt.

use serde::Serialize;

use qpolicy_core::{PolicyName, PolicyState};

/// Text shown for a state in diffs and in absent-workflow results.
pub(crate) fn state_text(state: PolicyState) -> String {
    format!("{state}\n")
}

/// One before/after pair, shaped for a diff viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffEntry {
    pub before: String,
    pub before_header: String,
    pub after: String,
    pub after_header: String,
}

impl DiffEntry {
    /// Pair with both headers set to `<name> (<tag>)`.
    pub(crate) fn tagged(name: &PolicyName, tag: &str, before: String, after: String) -> Self {
        let header = format!("{name} ({tag})");
        Self {
            before,
            before_header: header.clone(),
            after,
            after_header: header,
        }
    }

    pub(crate) fn state(name: &PolicyName, before: PolicyState, after: PolicyState) -> Self {
        Self::tagged(name, "state", state_text(before), state_text(after))
    }
}

/// What a reconcile did, or in check mode would have done.
///
/// For the present workflow `before`/`after` hold document content; for
/// the absent workflow they hold the state text (`present\n` or
/// `absent\n`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileResult {
    pub changed: bool,
    pub name: PolicyName,
    pub is_include: bool,
    pub state: PolicyState,
    /// The document did not exist when read (present workflow only).
    #[serde(rename = "new", skip_serializing_if = "Option::is_none")]
    pub is_new: Option<bool>,
    /// Desired content (present workflow only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub before: String,
    pub after: String,
    /// Filled only when diffs were requested.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diff: Vec<DiffEntry>,
}

impl ReconcileResult {
    /// Whether the state read differs from the desired one, i.e. whether a
    /// write was, or in check mode would be, needed.
    pub fn would_change(&self) -> bool {
        match self.state {
            PolicyState::Present => self.before != self.after,
            PolicyState::Absent => self.before == state_text(PolicyState::Present),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        // Every field serializes infallibly.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
