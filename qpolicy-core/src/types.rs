//! Domain types for policy reconciliation.
//!
//! A [`PolicyName`] only exists once it has passed the name validator; the
//! store never sees an unvalidated name.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use qpolicy_tools::editor::INCLUDE_DIR;

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

/// The two disjoint namespaces of the policy store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyCategory {
    Ordinary,
    Include,
}

impl fmt::Display for PolicyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyCategory::Ordinary => write!(f, "ordinary"),
            PolicyCategory::Include => write!(f, "include"),
        }
    }
}

/// A normalized, validated policy name such as `30-user` or
/// `include/admin-ro`. Construct with [`PolicyName::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PolicyName(String);

impl PolicyName {
    /// Wrap a name the validator already returned.
    pub(crate) fn from_validated(name: String) -> Self {
        Self(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn category(&self) -> PolicyCategory {
        match self.0.split_once('/') {
            Some((parent, _)) if parent == INCLUDE_DIR => PolicyCategory::Include,
            _ => PolicyCategory::Ordinary,
        }
    }

    /// `true` iff the parent segment is `include`.
    pub fn is_include(&self) -> bool {
        self.category() == PolicyCategory::Include
    }

    /// Key of this policy inside its namespace: the file name for include
    /// policies, the whole name otherwise.
    pub fn store_key(&self) -> &str {
        match self.category() {
            PolicyCategory::Include => self.0.rsplit('/').next().unwrap_or(&self.0),
            PolicyCategory::Ordinary => &self.0,
        }
    }
}

impl fmt::Display for PolicyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for PolicyName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Concurrency token
// ---------------------------------------------------------------------------

/// Opaque version handle returned by `get` and presented back on `replace`.
///
/// Deliberately neither ordered nor comparable: the store alone decides
/// whether a token is still current.
#[derive(Clone)]
pub struct ConcurrencyToken(String);

impl ConcurrencyToken {
    /// Wire form of the "document does not exist yet" sentinel.
    pub const NEW: &'static str = "new";

    /// Sentinel for a first write.
    pub fn new_document() -> Self {
        Self(Self::NEW.to_string())
    }

    /// Token exactly as the store sent it.
    pub fn from_wire(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Token exactly as the store expects it back.
    pub fn as_wire(&self) -> &str {
        &self.0
    }

    pub fn is_new(&self) -> bool {
        self.0 == Self::NEW
    }
}

impl fmt::Debug for ConcurrencyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_new() {
            f.write_str("ConcurrencyToken(new)")
        } else {
            f.write_str("ConcurrencyToken(..)")
        }
    }
}

// ---------------------------------------------------------------------------
// Documents and states
// ---------------------------------------------------------------------------

/// A policy as read from the store. Never persisted locally.
#[derive(Debug, Clone)]
pub struct PolicyDocument {
    pub name: PolicyName,
    pub content: String,
    pub token: ConcurrencyToken,
}

/// Desired or observed existence of a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyState {
    #[default]
    Present,
    Absent,
}

impl fmt::Display for PolicyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyState::Present => write!(f, "present"),
            PolicyState::Absent => write!(f, "absent"),
        }
    }
}

impl FromStr for PolicyState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "present" => Ok(PolicyState::Present),
            "absent" => Ok(PolicyState::Absent),
            other => Err(format!(
                "unknown state '{other}'; expected: present, absent"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
