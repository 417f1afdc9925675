//! Identifier validation.
//!
//! The grammar belongs to the policy editor routine; this module only runs
//! it in a [`ToolContext`] and wraps its verdict.

use std::str::FromStr;

use qpolicy_tools::{editor, ToolContext};

use crate::error::InvalidNameError;
use crate::types::PolicyName;

impl PolicyName {
    /// Normalize and validate `raw`.
    pub fn validate(raw: &str) -> Result<Self, InvalidNameError> {
        let canonical = ToolContext::new("")
            .run(|| editor::validate_name(raw))
            .map_err(|source| InvalidNameError {
                name: raw.to_string(),
                source,
            })?;
        tracing::debug!(raw, name = %canonical, "policy name validated");
        Ok(PolicyName::from_validated(canonical))
    }
}

impl FromStr for PolicyName {
    type Err = InvalidNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PolicyName::validate(s)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::types::PolicyCategory;

    #[rstest]
    #[case("30-example", "30-example", PolicyCategory::Ordinary)]
    #[case("include/admin-ro", "include/admin-ro", PolicyCategory::Include)]
    #[case("include//admin-ro", "include/admin-ro", PolicyCategory::Include)]
    #[case("./50-config", "50-config", PolicyCategory::Ordinary)]
    fn valid_names_are_normalized(
        #[case] raw: &str,
        #[case] expected: &str,
        #[case] category: PolicyCategory,
    ) {
        let name = PolicyName::validate(raw).expect("valid");
        assert_eq!(name.as_str(), expected);
        assert_eq!(name.category(), category);
    }

    #[rstest]
    #[case("../etc/passwd")]
    #[case("include/../30-user")]
    #[case("30 user")]
    #[case("bad*name")]
    #[case("")]
    fn invalid_names_are_rejected(#[case] raw: &str) {
        let err = PolicyName::validate(raw).expect_err("invalid");
        assert_eq!(err.name, raw);
        assert!(
            err.to_string().starts_with("name validation failed: invalid policy name"),
            "got: {err}"
        );
    }

    #[test]
    fn from_str_validates() {
        assert!("include/admin-ro".parse::<PolicyName>().is_ok());
        assert!("../x".parse::<PolicyName>().is_err());
    }
}
