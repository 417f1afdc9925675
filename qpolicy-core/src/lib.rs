//! qpolicy core library — domain types, name and content validation, errors.
//!
//! Public API surface:
//! - [`types`] — [`PolicyName`], [`ConcurrencyToken`], [`PolicyDocument`], [`PolicyState`]
//! - [`name`] — [`PolicyName::validate`]
//! - [`lint`] — [`lint()`](lint::lint), the content validator
//! - [`error`] — [`InvalidNameError`], [`ValidationError`]

pub mod error;
pub mod lint;
pub mod name;
pub mod types;

pub use error::{InvalidNameError, ValidationError};
pub use lint::lint;
pub use types::{ConcurrencyToken, PolicyCategory, PolicyDocument, PolicyName, PolicyState};
