//! `qpolicy apply` — converge one policy to a desired state.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;

use qpolicy_core::PolicyState;
use qpolicy_reconcile::{
    render_unified, ContentSource, DesiredState, PolicyReconciler, ReconcileOptions,
    ReconcileResult,
};

use super::StoreArgs;

/// Arguments for `qpolicy apply`.
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Policy name, e.g. `30-user` or `include/admin-ro`.
    pub name: String,

    /// Desired content, inline.
    #[arg(long, conflicts_with = "path")]
    pub content: Option<String>,

    /// Read the desired content from this file.
    #[arg(long, value_name = "FILE")]
    pub path: Option<PathBuf>,

    /// Whether the policy should exist.
    #[arg(long, default_value_t = PolicyState::Present)]
    pub state: PolicyState,

    /// Report what would change without writing.
    #[arg(long)]
    pub check: bool,

    /// Show before/after diffs.
    #[arg(long)]
    pub diff: bool,

    /// Emit the result (or failure) as JSON.
    #[arg(long)]
    pub json: bool,
}

impl ApplyArgs {
    pub fn run(self, store: &StoreArgs) -> Result<()> {
        match self.reconcile(store) {
            Ok(result) if self.json => {
                println!("{}", serde_json::to_string_pretty(&result.to_json())?);
                Ok(())
            }
            Ok(result) => {
                print_result(&result, self.check);
                Ok(())
            }
            Err(err) if self.json => {
                let failure = serde_json::json!({ "failed": true, "msg": err.to_string() });
                println!("{}", serde_json::to_string_pretty(&failure)?);
                std::process::exit(1);
            }
            Err(err) => Err(err),
        }
    }

    fn desired(&self) -> Result<DesiredState> {
        match self.state {
            PolicyState::Absent => Ok(DesiredState::Absent),
            PolicyState::Present => {
                let source = match (&self.content, &self.path) {
                    (Some(content), _) => ContentSource::Inline(content.clone()),
                    (None, Some(path)) => ContentSource::File(path.clone()),
                    (None, None) => bail!("state is present but neither --content nor --path was given"),
                };
                Ok(DesiredState::Present(source))
            }
        }
    }

    fn reconcile(&self, store: &StoreArgs) -> Result<ReconcileResult> {
        let desired = self.desired()?;
        let admin = store.connect()?;
        let options = ReconcileOptions {
            check_mode: self.check,
            diff: self.diff,
        };
        let reconciler = PolicyReconciler::new(admin.as_ref(), &self.name, options)?;
        tracing::debug!(name = %reconciler.name(), state = %desired.state(), check = self.check, "reconciling");
        Ok(reconciler.run(&desired)?)
    }
}

fn print_result(result: &ReconcileResult, check: bool) {
    let prefix = if check { "[check] " } else { "" };
    let acted = if check {
        result.would_change()
    } else {
        result.changed
    };
    let verb = match (acted, result.state, result.is_new) {
        (false, _, _) => None,
        (true, PolicyState::Absent, _) => Some("removed"),
        (true, PolicyState::Present, Some(true)) => Some("created"),
        (true, PolicyState::Present, _) => Some("updated"),
    };

    match verb {
        Some(verb) if check => {
            println!("{prefix}{} '{}' would be {verb}", "✎".yellow(), result.name)
        }
        Some(verb) => println!("{prefix}{} '{}' {verb}", "✎".green(), result.name),
        None => println!("{prefix}{} '{}' unchanged", "·".dimmed(), result.name),
    }

    for entry in &result.diff {
        let text = render_unified(entry);
        print!("{text}");
        if !text.is_empty() && !text.ends_with('\n') {
            println!();
        }
    }
}
