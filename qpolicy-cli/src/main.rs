//! qpolicy — converge qrexec policy documents in the admin qube.
//!
//! # Usage
//!
//! ```text
//! qpolicy apply <name> (--content TEXT | --path FILE) [--state present|absent] [--check] [--diff] [--json]
//! qpolicy get <name>
//! qpolicy list [--include]
//! qpolicy lint <file|-> [--include]
//! ```
//!
//! Global: `--config FILE` selects the store config, `--store-dir DIR`
//! serves the store from a local policy directory instead.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    apply::ApplyArgs, get::GetArgs, lint::LintArgs, list::ListArgs, StoreArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "qpolicy",
    version,
    about = "Manage qrexec policy documents through the policy admin services",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Converge a policy to the desired content or absence.
    Apply(ApplyArgs),

    /// Print the current content of a policy.
    Get(GetArgs),

    /// List policy names.
    List(ListArgs),

    /// Check policy content without touching the store.
    Lint(LintArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Apply(args) => args.run(&cli.store),
        Commands::Get(args) => args.run(&cli.store),
        Commands::List(args) => args.run(&cli.store),
        Commands::Lint(args) => args.run(),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
