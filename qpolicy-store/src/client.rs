//! Per-document store client.
//!
//! A [`PolicyStore`] is bound to one validated [`PolicyName`] and routes
//! every call to the ordinary or include half of the admin surface. Each
//! call runs inside a [`ToolContext`], so admin failures surface as
//! [`StoreError`]s naming the operation.

use std::collections::BTreeSet;

use qpolicy_core::{ConcurrencyToken, InvalidNameError, PolicyCategory, PolicyDocument, PolicyName};
use qpolicy_tools::{editor::INCLUDE_DIR, ToolContext, ToolExit};

use crate::admin::PolicyAdmin;
use crate::error::{StoreError, StoreOperation};

/// Store client for a single policy document.
pub struct PolicyStore<'a, A: PolicyAdmin + ?Sized> {
    admin: &'a A,
    name: PolicyName,
}

impl<'a, A: PolicyAdmin + ?Sized> PolicyStore<'a, A> {
    pub fn new(admin: &'a A, name: PolicyName) -> Self {
        Self { admin, name }
    }

    /// Validate `raw` and bind a client to it. No remote call is made.
    pub fn open(admin: &'a A, raw: &str) -> Result<Self, InvalidNameError> {
        Ok(Self::new(admin, PolicyName::validate(raw)?))
    }

    pub fn name(&self) -> &PolicyName {
        &self.name
    }

    pub fn is_include(&self) -> bool {
        self.name.is_include()
    }

    /// Current content and token.
    pub fn get(&self) -> Result<PolicyDocument, StoreError> {
        let key = self.name.store_key();
        let (content, token) = self.call(StoreOperation::Get, |admin| match self.name.category() {
            PolicyCategory::Ordinary => admin.policy_get(key),
            PolicyCategory::Include => admin.policy_include_get(key),
        })?;
        Ok(PolicyDocument {
            name: self.name.clone(),
            content,
            token,
        })
    }

    /// Write `content` iff `token` is still current.
    pub fn replace(&self, content: &str, token: &ConcurrencyToken) -> Result<(), StoreError> {
        let key = self.name.store_key();
        self.call(StoreOperation::Replace, |admin| match self.name.category() {
            PolicyCategory::Ordinary => admin.policy_replace(key, content, token),
            PolicyCategory::Include => admin.policy_include_replace(key, content, token),
        })
    }

    pub fn remove(&self) -> Result<(), StoreError> {
        let key = self.name.store_key();
        self.call(StoreOperation::Remove, |admin| match self.name.category() {
            PolicyCategory::Ordinary => admin.policy_remove(key),
            PolicyCategory::Include => admin.policy_include_remove(key),
        })
    }

    /// Names in this document's namespace, in the same form as
    /// [`PolicyStore::name`] so membership can be tested directly.
    pub fn list(&self) -> Result<BTreeSet<PolicyName>, StoreError> {
        list_names(self.admin, self.name.category())
    }

    fn call<T, F>(&self, operation: StoreOperation, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&A) -> Result<T, ToolExit>,
    {
        call(self.admin, operation, self.name.as_str(), f)
    }
}

/// Every policy name in one namespace.
///
/// Entries the name validator refuses are skipped.
pub fn list_names<A: PolicyAdmin + ?Sized>(
    admin: &A,
    category: PolicyCategory,
) -> Result<BTreeSet<PolicyName>, StoreError> {
    let keys = call(admin, StoreOperation::List, &category.to_string(), |admin| {
        match category {
            PolicyCategory::Ordinary => admin.policy_list(),
            PolicyCategory::Include => admin.policy_include_list(),
        }
    })?;

    let mut names = BTreeSet::new();
    for key in keys {
        let raw = match category {
            PolicyCategory::Ordinary => key,
            PolicyCategory::Include => format!("{INCLUDE_DIR}/{key}"),
        };
        match PolicyName::validate(&raw) {
            Ok(name) => {
                names.insert(name);
            }
            Err(err) => tracing::warn!(entry = %raw, error = %err, "skipping unlistable policy"),
        }
    }
    Ok(names)
}

fn call<A, T, F>(admin: &A, operation: StoreOperation, subject: &str, f: F) -> Result<T, StoreError>
where
    A: PolicyAdmin + ?Sized,
    F: FnOnce(&A) -> Result<T, ToolExit>,
{
    tracing::debug!(subject, %operation, "store call");
    ToolContext::new("").run(|| f(admin)).map_err(|source| {
        let err = StoreError::new(operation, source);
        tracing::debug!(subject, error = %err, kind = ?err.kind, "store call failed");
        err
    })
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::directory::DirectoryAdmin;
    use crate::StoreErrorKind;

    #[test]
    fn open_rejects_invalid_name_without_touching_store() {
        let tmp = TempDir::new().unwrap();
        let admin = DirectoryAdmin::new(tmp.path().join("never-created"));
        assert!(PolicyStore::open(&admin, "../escape").is_err());
        assert!(!tmp.path().join("never-created").exists());
    }

    #[test]
    fn include_policy_uses_file_name_as_key() {
        let tmp = TempDir::new().unwrap();
        let admin = DirectoryAdmin::new(tmp.path());
        let store = PolicyStore::open(&admin, "include/admin-ro").unwrap();
        store
            .replace("@anyvm @adminvm allow\n", &ConcurrencyToken::new_document())
            .unwrap();
        assert!(tmp.path().join("include").join("admin-ro").is_file());

        let doc = store.get().unwrap();
        assert_eq!(doc.name.as_str(), "include/admin-ro");
        assert_eq!(doc.content, "@anyvm @adminvm allow\n");
    }

    #[test]
    fn get_of_missing_policy_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let admin = DirectoryAdmin::new(tmp.path());
        let store = PolicyStore::open(&admin, "30-missing").unwrap();
        let err = store.get().unwrap_err();
        assert_eq!(err.operation, StoreOperation::Get);
        assert_eq!(err.kind, StoreErrorKind::NotFound);
        assert!(err.to_string().starts_with("error during client method 'get': Not found"));
    }

    #[test]
    fn list_returns_names_comparable_with_own_name() {
        let tmp = TempDir::new().unwrap();
        let admin = DirectoryAdmin::new(tmp.path());
        let store = PolicyStore::open(&admin, "include/admin-ro").unwrap();
        store
            .replace("", &ConcurrencyToken::new_document())
            .unwrap();
        let listed = store.list().unwrap();
        assert!(listed.contains(store.name()));
        assert_eq!(listed.len(), 1);
    }

    #[test]
    fn list_skips_entries_the_validator_refuses() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("30-ok.policy"), "").unwrap();
        std::fs::write(tmp.path().join("bad$name.policy"), "").unwrap();
        let admin = DirectoryAdmin::new(tmp.path());
        let store = PolicyStore::open(&admin, "30-ok").unwrap();
        let listed: Vec<String> = store.list().unwrap().iter().map(|n| n.to_string()).collect();
        assert_eq!(listed, vec!["30-ok"]);
    }
}
