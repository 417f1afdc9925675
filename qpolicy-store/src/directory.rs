//! Directory-backed policy store.
//!
//! Serves the admin surface from a local policy directory laid out like the
//! admin qube's:
//!
//! ```text
//! <root>/
//!   <name>.policy        (ordinary policies)
//!   include/
//!     <name>             (include policies)
//! ```
//!
//! Tokens are `sha256:<hex>` of the file content. `replace` checks the token
//! and writes under one lock, using `<file>.qpolicy.tmp` + rename.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use qpolicy_core::{ConcurrencyToken, PolicyCategory};
use qpolicy_tools::{editor::INCLUDE_DIR, ToolExit, FAILURE_STATUS};

use crate::admin::PolicyAdmin;

const POLICY_SUFFIX: &str = ".policy";
const TMP_SUFFIX: &str = ".qpolicy.tmp";

/// Token of a stored document with this content.
pub fn content_token(content: &str) -> ConcurrencyToken {
    let mut h = Sha256::new();
    h.update(content.as_bytes());
    ConcurrencyToken::from_wire(format!("sha256:{}", hex::encode(h.finalize())))
}

/// Policy store over a local directory.
#[derive(Debug)]
pub struct DirectoryAdmin {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl DirectoryAdmin {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dir_for(&self, category: PolicyCategory) -> PathBuf {
        match category {
            PolicyCategory::Ordinary => self.root.clone(),
            PolicyCategory::Include => self.root.join(INCLUDE_DIR),
        }
    }

    fn path_for(&self, category: PolicyCategory, name: &str) -> Result<PathBuf, ToolExit> {
        if name.is_empty() || name.contains('/') || name.starts_with('.') {
            return Err(refuse(format!("Invalid policy name: {name}")));
        }
        let file = match category {
            PolicyCategory::Ordinary => format!("{name}{POLICY_SUFFIX}"),
            PolicyCategory::Include => name.to_string(),
        };
        Ok(self.dir_for(category).join(file))
    }

    fn get(
        &self,
        category: PolicyCategory,
        name: &str,
    ) -> Result<(String, ConcurrencyToken), ToolExit> {
        let path = self.path_for(category, name)?;
        let content = read_existing(&path)?.ok_or_else(|| not_found(&path))?;
        let token = content_token(&content);
        Ok((content, token))
    }

    fn replace(
        &self,
        category: PolicyCategory,
        name: &str,
        content: &str,
        token: &ConcurrencyToken,
    ) -> Result<(), ToolExit> {
        let path = self.path_for(category, name)?;
        let _guard = self.write_lock.lock();

        match (read_existing(&path)?, token.is_new()) {
            (Some(_), true) => return Err(refuse("File exists but token is \"new\"")),
            (None, false) => return Err(refuse("File does not exist but token is not \"new\"")),
            (Some(current), false) => {
                if content_token(&current).as_wire() != token.as_wire() {
                    return Err(refuse("Token mismatch"));
                }
            }
            (None, true) => {}
        }

        atomic_write(&path, content)?;
        tracing::debug!(path = %path.display(), "policy file written");
        Ok(())
    }

    fn remove(&self, category: PolicyCategory, name: &str) -> Result<(), ToolExit> {
        let path = self.path_for(category, name)?;
        let _guard = self.write_lock.lock();
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "policy file removed");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Err(not_found(&path)),
            Err(err) => Err(io_failure(&path, err)),
        }
    }

    fn list(&self, category: PolicyCategory) -> Result<Vec<String>, ToolExit> {
        let dir = self.dir_for(category);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(err) => return Err(io_failure(&dir, err)),
        };

        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| !name.ends_with(TMP_SUFFIX) && !name.starts_with('.'))
            .filter_map(|name| match category {
                PolicyCategory::Ordinary => name.strip_suffix(POLICY_SUFFIX).map(str::to_string),
                PolicyCategory::Include => Some(name),
            })
            .collect();
        names.sort();
        Ok(names)
    }
}

impl PolicyAdmin for DirectoryAdmin {
    fn policy_get(&self, name: &str) -> Result<(String, ConcurrencyToken), ToolExit> {
        self.get(PolicyCategory::Ordinary, name)
    }

    fn policy_replace(
        &self,
        name: &str,
        content: &str,
        token: &ConcurrencyToken,
    ) -> Result<(), ToolExit> {
        self.replace(PolicyCategory::Ordinary, name, content, token)
    }

    fn policy_remove(&self, name: &str) -> Result<(), ToolExit> {
        self.remove(PolicyCategory::Ordinary, name)
    }

    fn policy_list(&self) -> Result<Vec<String>, ToolExit> {
        self.list(PolicyCategory::Ordinary)
    }

    fn policy_include_get(&self, name: &str) -> Result<(String, ConcurrencyToken), ToolExit> {
        self.get(PolicyCategory::Include, name)
    }

    fn policy_include_replace(
        &self,
        name: &str,
        content: &str,
        token: &ConcurrencyToken,
    ) -> Result<(), ToolExit> {
        self.replace(PolicyCategory::Include, name, content, token)
    }

    fn policy_include_remove(&self, name: &str) -> Result<(), ToolExit> {
        self.remove(PolicyCategory::Include, name)
    }

    fn policy_include_list(&self) -> Result<Vec<String>, ToolExit> {
        self.list(PolicyCategory::Include)
    }
}

// ---------------------------------------------------------------------------
// File helpers
// ---------------------------------------------------------------------------

fn read_existing(path: &Path) -> Result<Option<String>, ToolExit> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_failure(path, err)),
    }
}

fn atomic_write(path: &Path, content: &str) -> Result<(), ToolExit> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_failure(parent, e))?;
    }
    let tmp = PathBuf::from(format!("{}{TMP_SUFFIX}", path.display()));
    std::fs::write(&tmp, content).map_err(|e| io_failure(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_failure(path, e));
    }
    Ok(())
}

fn refuse(message: impl Into<String>) -> ToolExit {
    let mut stderr = message.into();
    stderr.push('\n');
    ToolExit::command_failed(Some(FAILURE_STATUS), stderr)
}

fn not_found(path: &Path) -> ToolExit {
    refuse(format!("Not found: {}", path.display()))
}

fn io_failure(path: &Path, err: std::io::Error) -> ToolExit {
    refuse(format!("{}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn create_then_get_round_trips() {
        let tmp = TempDir::new().unwrap();
        let admin = DirectoryAdmin::new(tmp.path());
        admin
            .policy_replace("30-user", "svc * work vault allow\n", &ConcurrencyToken::new_document())
            .unwrap();

        assert!(tmp.path().join("30-user.policy").exists());
        let (content, token) = admin.policy_get("30-user").unwrap();
        assert_eq!(content, "svc * work vault allow\n");
        assert!(!token.is_new());
    }

    #[test]
    fn include_policies_live_in_include_dir() {
        let tmp = TempDir::new().unwrap();
        let admin = DirectoryAdmin::new(tmp.path());
        admin
            .policy_include_replace("admin-ro", "@anyvm @adminvm allow\n", &ConcurrencyToken::new_document())
            .unwrap();

        assert!(tmp.path().join("include").join("admin-ro").exists());
        assert_eq!(admin.policy_include_list().unwrap(), vec!["admin-ro"]);
        assert!(admin.policy_list().unwrap().is_empty());
        assert!(admin.policy_get("admin-ro").is_err());
    }

    #[test]
    fn stale_token_is_rejected_and_file_untouched() {
        let tmp = TempDir::new().unwrap();
        let admin = DirectoryAdmin::new(tmp.path());
        admin
            .policy_replace("30-user", "v1\n", &ConcurrencyToken::new_document())
            .unwrap();
        let (_, stale) = admin.policy_get("30-user").unwrap();
        admin.policy_replace("30-user", "v2\n", &stale).unwrap();

        let err = admin.policy_replace("30-user", "v3\n", &stale).unwrap_err();
        match err {
            ToolExit::CommandFailed { stderr, .. } => {
                assert_eq!(String::from_utf8_lossy(&stderr), "Token mismatch\n")
            }
            other => panic!("unexpected exit {other:?}"),
        }
        assert_eq!(fs::read_to_string(tmp.path().join("30-user.policy")).unwrap(), "v2\n");
    }

    #[test]
    fn new_token_on_existing_file_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let admin = DirectoryAdmin::new(tmp.path());
        let new = ConcurrencyToken::new_document();
        admin.policy_replace("30-user", "v1\n", &new).unwrap();
        assert!(admin.policy_replace("30-user", "v2\n", &new).is_err());
    }

    #[test]
    fn missing_policy_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let admin = DirectoryAdmin::new(tmp.path());
        for err in [
            admin.policy_get("nope").unwrap_err(),
            admin.policy_remove("nope").unwrap_err(),
        ] {
            match err {
                ToolExit::CommandFailed { stderr, .. } => {
                    assert!(String::from_utf8_lossy(&stderr).starts_with("Not found: "))
                }
                other => panic!("unexpected exit {other:?}"),
            }
        }
    }

    #[test]
    fn list_ignores_tmp_and_foreign_files() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("30-a.policy"), "").unwrap();
        fs::write(tmp.path().join("10-b.policy"), "").unwrap();
        fs::write(tmp.path().join("README"), "").unwrap();
        fs::write(tmp.path().join("40-c.policy.qpolicy.tmp"), "").unwrap();
        let admin = DirectoryAdmin::new(tmp.path());
        assert_eq!(admin.policy_list().unwrap(), vec!["10-b", "30-a"]);
    }

    #[test]
    fn list_of_missing_root_is_empty() {
        let tmp = TempDir::new().unwrap();
        let admin = DirectoryAdmin::new(tmp.path().join("absent"));
        assert!(admin.policy_list().unwrap().is_empty());
    }

    #[test]
    fn names_with_separators_are_refused() {
        let tmp = TempDir::new().unwrap();
        let admin = DirectoryAdmin::new(tmp.path());
        assert!(admin.policy_get("../escape").is_err());
        assert!(admin.policy_include_get("a/b").is_err());
    }

    #[test]
    fn identical_content_yields_identical_token() {
        assert_eq!(
            content_token("x").as_wire(),
            content_token("x").as_wire()
        );
        assert_ne!(content_token("x").as_wire(), content_token("y").as_wire());
    }
}
