//! The policy admin RPC surface.
//!
//! Each method mirrors one admin service call. Ordinary and include
//! policies live in disjoint namespaces with identical semantics. Failures
//! are reported the way an external command reports them, as
//! [`ToolExit::CommandFailed`] with the service's stderr, so callers run
//! these inside a [`qpolicy_tools::ToolContext`].

use qpolicy_core::ConcurrencyToken;
use qpolicy_tools::ToolExit;

pub trait PolicyAdmin {
    /// Content and current token of `name`.
    fn policy_get(&self, name: &str) -> Result<(String, ConcurrencyToken), ToolExit>;

    /// Replace `name` with `content` iff `token` is still current
    /// ([`ConcurrencyToken::new_document`] = create if absent).
    fn policy_replace(
        &self,
        name: &str,
        content: &str,
        token: &ConcurrencyToken,
    ) -> Result<(), ToolExit>;

    fn policy_remove(&self, name: &str) -> Result<(), ToolExit>;

    fn policy_list(&self) -> Result<Vec<String>, ToolExit>;

    fn policy_include_get(&self, name: &str) -> Result<(String, ConcurrencyToken), ToolExit>;

    fn policy_include_replace(
        &self,
        name: &str,
        content: &str,
        token: &ConcurrencyToken,
    ) -> Result<(), ToolExit>;

    fn policy_include_remove(&self, name: &str) -> Result<(), ToolExit>;

    fn policy_include_list(&self) -> Result<Vec<String>, ToolExit>;
}
