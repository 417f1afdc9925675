//! End-to-end reconcile behaviour against a directory-backed store, with a
//! recording wrapper to observe which admin calls were made.

use std::cell::{Cell, RefCell};
use std::fs;

use qpolicy_core::ConcurrencyToken;
use qpolicy_reconcile::{ContentSource, PolicyReconciler, ReconcileError, ReconcileOptions};
use qpolicy_store::{DirectoryAdmin, PolicyAdmin, PolicyStore};
use qpolicy_tools::ToolExit;
use rstest::rstest;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test admins
// ---------------------------------------------------------------------------

/// Delegates to a [`DirectoryAdmin`] and logs every call as `method(key)`.
struct RecordingAdmin {
    inner: DirectoryAdmin,
    calls: RefCell<Vec<String>>,
}

impl RecordingAdmin {
    fn new(tmp: &TempDir) -> Self {
        Self {
            inner: DirectoryAdmin::new(tmp.path()),
            calls: RefCell::new(Vec::new()),
        }
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl PolicyAdmin for RecordingAdmin {
    fn policy_get(&self, name: &str) -> Result<(String, ConcurrencyToken), ToolExit> {
        self.record(format!("policy_get({name})"));
        self.inner.policy_get(name)
    }

    fn policy_replace(
        &self,
        name: &str,
        content: &str,
        token: &ConcurrencyToken,
    ) -> Result<(), ToolExit> {
        self.record(format!("policy_replace({name})"));
        self.inner.policy_replace(name, content, token)
    }

    fn policy_remove(&self, name: &str) -> Result<(), ToolExit> {
        self.record(format!("policy_remove({name})"));
        self.inner.policy_remove(name)
    }

    fn policy_list(&self) -> Result<Vec<String>, ToolExit> {
        self.record("policy_list()".to_string());
        self.inner.policy_list()
    }

    fn policy_include_get(&self, name: &str) -> Result<(String, ConcurrencyToken), ToolExit> {
        self.record(format!("policy_include_get({name})"));
        self.inner.policy_include_get(name)
    }

    fn policy_include_replace(
        &self,
        name: &str,
        content: &str,
        token: &ConcurrencyToken,
    ) -> Result<(), ToolExit> {
        self.record(format!("policy_include_replace({name})"));
        self.inner.policy_include_replace(name, content, token)
    }

    fn policy_include_remove(&self, name: &str) -> Result<(), ToolExit> {
        self.record(format!("policy_include_remove({name})"));
        self.inner.policy_include_remove(name)
    }

    fn policy_include_list(&self) -> Result<Vec<String>, ToolExit> {
        self.record("policy_include_list()".to_string());
        self.inner.policy_include_list()
    }
}

/// Lets another writer replace the document right after the first `get`.
struct RacingAdmin {
    inner: DirectoryAdmin,
    raced: Cell<bool>,
}

impl PolicyAdmin for RacingAdmin {
    fn policy_get(&self, name: &str) -> Result<(String, ConcurrencyToken), ToolExit> {
        let read = self.inner.policy_get(name);
        if !self.raced.replace(true) {
            let (_, token) = self.inner.policy_get(name)?;
            self.inner.policy_replace(name, "svc * * deny\n", &token)?;
        }
        read
    }

    fn policy_replace(
        &self,
        name: &str,
        content: &str,
        token: &ConcurrencyToken,
    ) -> Result<(), ToolExit> {
        self.inner.policy_replace(name, content, token)
    }

    fn policy_remove(&self, name: &str) -> Result<(), ToolExit> {
        self.inner.policy_remove(name)
    }

    fn policy_list(&self) -> Result<Vec<String>, ToolExit> {
        self.inner.policy_list()
    }

    fn policy_include_get(&self, name: &str) -> Result<(String, ConcurrencyToken), ToolExit> {
        self.inner.policy_include_get(name)
    }

    fn policy_include_replace(
        &self,
        name: &str,
        content: &str,
        token: &ConcurrencyToken,
    ) -> Result<(), ToolExit> {
        self.inner.policy_include_replace(name, content, token)
    }

    fn policy_include_remove(&self, name: &str) -> Result<(), ToolExit> {
        self.inner.policy_include_remove(name)
    }

    fn policy_include_list(&self) -> Result<Vec<String>, ToolExit> {
        self.inner.policy_include_list()
    }
}

fn inline(content: &str) -> ContentSource {
    ContentSource::Inline(content.to_string())
}

fn reconciler<'a, A: PolicyAdmin>(admin: &'a A, name: &str) -> PolicyReconciler<'a, A> {
    PolicyReconciler::new(admin, name, ReconcileOptions::default()).expect("valid name")
}

// ---------------------------------------------------------------------------
// Present
// ---------------------------------------------------------------------------

#[test]
fn present_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let admin = DirectoryAdmin::new(tmp.path());
    let r = reconciler(&admin, "30-example");

    assert!(r.present(&inline("svc * work vault allow\n")).unwrap().changed);
    assert!(!r.present(&inline("svc * work vault allow\n")).unwrap().changed);
}

#[test]
fn present_then_get_round_trips_with_real_token() {
    let tmp = TempDir::new().unwrap();
    let admin = DirectoryAdmin::new(tmp.path());
    reconciler(&admin, "30-example")
        .present(&inline("svc * work vault allow\n"))
        .unwrap();

    let doc = PolicyStore::open(&admin, "30-example").unwrap().get().unwrap();
    assert_eq!(doc.content, "svc * work vault allow\n");
    assert!(!doc.token.is_new());
}

#[test]
fn empty_content_is_never_created() {
    let tmp = TempDir::new().unwrap();
    let admin = RecordingAdmin::new(&tmp);
    let result = reconciler(&admin, "30-empty").present(&inline("")).unwrap();

    assert!(!result.changed);
    assert_eq!(result.is_new, Some(true));
    assert_eq!(admin.calls(), vec!["policy_get(30-empty)"]);
    assert!(!tmp.path().join("30-empty.policy").exists());
}

#[test]
fn comparison_is_exact() {
    let tmp = TempDir::new().unwrap();
    let admin = DirectoryAdmin::new(tmp.path());
    let r = reconciler(&admin, "30-example");
    r.present(&inline("svc * work vault allow\n")).unwrap();

    let without_newline = r.present(&inline("svc * work vault allow")).unwrap();
    assert!(without_newline.changed, "trailing newline is significant");
    assert_eq!(without_newline.before, "svc * work vault allow\n");
}

#[test]
fn new_policy_scenario() {
    let tmp = TempDir::new().unwrap();
    let admin = DirectoryAdmin::new(tmp.path());
    let result = reconciler(&admin, "30-example")
        .present(&inline("service * * allow\n"))
        .unwrap();

    assert!(result.changed);
    assert_eq!(result.is_new, Some(true));
    assert_eq!(result.after, "service * * allow\n");
    assert_eq!(result.name.as_str(), "30-example");
    assert!(!result.is_include);
}

#[test]
fn include_policy_dispatches_to_include_calls() {
    let tmp = TempDir::new().unwrap();
    let admin = RecordingAdmin::new(&tmp);
    let result = reconciler(&admin, "include/admin-ro")
        .present(&inline("@anyvm @adminvm allow\n"))
        .unwrap();

    assert!(result.is_include);
    assert_eq!(
        admin.calls(),
        vec![
            "policy_include_get(admin-ro)",
            "policy_include_replace(admin-ro)",
        ]
    );
}

// ---------------------------------------------------------------------------
// Absent
// ---------------------------------------------------------------------------

#[test]
fn absent_on_missing_policy_is_unchanged_twice() {
    let tmp = TempDir::new().unwrap();
    let admin = DirectoryAdmin::new(tmp.path());
    let r = reconciler(&admin, "30-gone");

    for _ in 0..2 {
        let result = r.absent().unwrap();
        assert!(!result.changed);
        assert_eq!(result.before, "absent\n");
        assert_eq!(result.after, "absent\n");
    }
}

#[test]
fn absent_after_present_removes_once() {
    let tmp = TempDir::new().unwrap();
    let admin = RecordingAdmin::new(&tmp);
    let r = reconciler(&admin, "include/admin-ro");
    r.present(&inline("@anyvm @adminvm allow\n")).unwrap();

    assert!(r.absent().unwrap().changed);
    assert!(!r.absent().unwrap().changed);
    assert!(admin
        .calls()
        .iter()
        .all(|call| call.starts_with("policy_include_")));
}

#[test]
fn absent_in_check_mode_reports_without_removing() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("30-keep.policy"), "svc * * deny\n").unwrap();
    let admin = RecordingAdmin::new(&tmp);
    let options = ReconcileOptions {
        check_mode: true,
        diff: false,
    };
    let result = PolicyReconciler::new(&admin, "30-keep", options)
        .unwrap()
        .absent()
        .unwrap();

    assert!(!result.changed);
    assert_eq!(result.before, "present\n");
    assert_eq!(admin.calls(), vec!["policy_list()"]);
    assert!(tmp.path().join("30-keep.policy").exists());
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[rstest]
#[case("../etc/passwd")]
#[case("include/../30-user")]
#[case("30 user")]
#[case("30-user;rm")]
fn bad_names_fail_before_any_store_call(#[case] raw: &str) {
    let tmp = TempDir::new().unwrap();
    let admin = RecordingAdmin::new(&tmp);
    let err = PolicyReconciler::new(&admin, raw, ReconcileOptions::default())
        .err()
        .expect("invalid name");

    assert!(matches!(err, ReconcileError::InvalidName(_)));
    assert!(err.to_string().starts_with("name validation failed: "));
    assert!(admin.calls().is_empty());
}

#[test]
fn lint_failure_precedes_any_store_call() {
    let tmp = TempDir::new().unwrap();
    let admin = RecordingAdmin::new(&tmp);
    let err = reconciler(&admin, "30-example")
        .present(&inline("svc * work vault permit\n"))
        .unwrap_err();

    assert!(matches!(err, ReconcileError::Validation(_)));
    assert_eq!(err.to_string(), "lint failed: <stdin>:1: invalid action: permit");
    assert!(admin.calls().is_empty());
}

#[test]
fn stale_token_surfaces_conflict() {
    let tmp = TempDir::new().unwrap();
    let admin = DirectoryAdmin::new(tmp.path());
    let first = PolicyStore::open(&admin, "30-shared").unwrap();
    let second = PolicyStore::open(&admin, "30-shared").unwrap();

    let seen_by_first = first.get().err().map(|e| e.is_not_found());
    assert_eq!(seen_by_first, Some(true));
    let token_a = ConcurrencyToken::new_document();
    let token_b = ConcurrencyToken::new_document();

    first.replace("svc * * allow\n", &token_a).unwrap();
    let err = second.replace("svc * * deny\n", &token_b).unwrap_err();
    assert!(err.is_conflict(), "got: {err}");
    assert_eq!(first.get().unwrap().content, "svc * * allow\n");
}

#[test]
fn concurrent_write_between_read_and_replace_is_a_conflict() {
    let tmp = TempDir::new().unwrap();
    let admin = RacingAdmin {
        inner: DirectoryAdmin::new(tmp.path()),
        raced: Cell::new(false),
    };
    admin
        .inner
        .policy_replace("30-shared", "svc * * ask\n", &ConcurrencyToken::new_document())
        .unwrap();

    let err = reconciler(&admin, "30-shared")
        .present(&inline("svc * * allow\n"))
        .unwrap_err();

    assert!(err.is_conflict(), "got: {err}");
    assert!(err
        .to_string()
        .starts_with("error during client method 'replace': "));
    assert_eq!(
        fs::read_to_string(tmp.path().join("30-shared.policy")).unwrap(),
        "svc * * deny\n",
        "the concurrent write must survive"
    );
}
