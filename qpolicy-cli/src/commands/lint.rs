//! `qpolicy lint <file|-> [--include]` — validate content offline.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

/// Arguments for `qpolicy lint`.
#[derive(Args, Debug)]
pub struct LintArgs {
    /// Policy file to check; `-` reads standard input.
    pub file: PathBuf,

    /// Check against the include-service grammar.
    #[arg(long)]
    pub include: bool,
}

impl LintArgs {
    pub fn run(self) -> Result<()> {
        let content = if self.file.as_os_str() == "-" {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read standard input")?;
            buf
        } else {
            std::fs::read_to_string(&self.file)
                .with_context(|| format!("cannot read '{}'", self.file.display()))?
        };

        qpolicy_core::lint(&content, self.include)?;
        println!("{} {}: ok", "✓".green(), self.file.display());
        Ok(())
    }
}
