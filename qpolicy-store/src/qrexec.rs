//! qrexec transport for the policy admin services.
//!
//! Every call runs `<client> <target> <service>[+<name>]` with the request
//! payload on stdin:
//!
//! | Call    | Service                                  | Payload           | Reply             |
//! |---------|------------------------------------------|-------------------|-------------------|
//! | get     | `policy.Get` / `policy.include.Get`      | —                 | `TOKEN\nCONTENT`  |
//! | replace | `policy.Replace` / `policy.include.Replace` | `TOKEN\nCONTENT` | —              |
//! | remove  | `policy.Remove` / `policy.include.Remove`| —                 | —                 |
//! | list    | `policy.List` / `policy.include.List`    | —                 | one name per line |
//!
//! A nonzero exit status becomes [`ToolExit::CommandFailed`] carrying the
//! service's stderr.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use qpolicy_core::{ConcurrencyToken, PolicyCategory};
use qpolicy_tools::ToolExit;

use crate::admin::PolicyAdmin;

/// Admin client speaking qrexec to the admin qube.
#[derive(Debug, Clone)]
pub struct QrexecAdmin {
    client: PathBuf,
    target: String,
}

impl QrexecAdmin {
    pub fn new(client: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            client: client.into(),
            target: target.into(),
        }
    }

    pub fn client(&self) -> &Path {
        &self.client
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Run one service call and return its stdout.
    fn call(
        &self,
        category: PolicyCategory,
        operation: &str,
        name: Option<&str>,
        payload: Vec<u8>,
    ) -> Result<Vec<u8>, ToolExit> {
        let service = service_name(category, operation, name);
        tracing::debug!(target_qube = %self.target, %service, "qrexec call");

        let mut child = Command::new(&self.client)
            .arg(&self.target)
            .arg(&service)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                ToolExit::command_failed(
                    None,
                    format!("failed to run {}: {err}", self.client.display()),
                )
            })?;

        // Feed stdin from a separate thread so a chatty service cannot
        // fill its stdout pipe while we are still writing.
        let writer = child.stdin.take().map(|mut stdin| {
            std::thread::spawn(move || {
                let _ = stdin.write_all(&payload);
            })
        });

        let output = child.wait_with_output().map_err(|err| {
            ToolExit::command_failed(None, format!("{service}: {err}"))
        })?;
        if let Some(writer) = writer {
            let _ = writer.join();
        }

        if !output.status.success() {
            return Err(ToolExit::command_failed(output.status.code(), output.stderr));
        }
        Ok(output.stdout)
    }

    fn get(&self, category: PolicyCategory, name: &str) -> Result<(String, ConcurrencyToken), ToolExit> {
        let reply = self.call(category, "Get", Some(name), Vec::new())?;
        Ok(parse_get_reply(&String::from_utf8_lossy(&reply)))
    }

    fn replace(
        &self,
        category: PolicyCategory,
        name: &str,
        content: &str,
        token: &ConcurrencyToken,
    ) -> Result<(), ToolExit> {
        let payload = format!("{}\n{content}", token.as_wire()).into_bytes();
        self.call(category, "Replace", Some(name), payload)?;
        Ok(())
    }

    fn remove(&self, category: PolicyCategory, name: &str) -> Result<(), ToolExit> {
        self.call(category, "Remove", Some(name), Vec::new())?;
        Ok(())
    }

    fn list(&self, category: PolicyCategory) -> Result<Vec<String>, ToolExit> {
        let reply = self.call(category, "List", None, Vec::new())?;
        Ok(parse_list_reply(&String::from_utf8_lossy(&reply)))
    }
}

impl PolicyAdmin for QrexecAdmin {
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

fn service_name(category: PolicyCategory, operation: &str, name: Option<&str>) -> String {
    let prefix = match category {
        PolicyCategory::Ordinary => "policy",
        PolicyCategory::Include => "policy.include",
    };
    match name {
        Some(name) => format!("{prefix}.{operation}+{name}"),
        None => format!("{prefix}.{operation}"),
    }
}

fn parse_get_reply(reply: &str) -> (String, ConcurrencyToken) {
    let (token, content) = reply.split_once('\n').unwrap_or((reply, ""));
    (content.to_string(), ConcurrencyToken::from_wire(token.trim_end()))
}

fn parse_list_reply(reply: &str) -> Vec<String> {
    reply
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
