pub mod apply;
pub mod get;
pub mod lint;
pub mod list;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use qpolicy_store::{DirectoryAdmin, PolicyAdmin, StoreConfig};

/// Store selection shared by every subcommand.
#[derive(Args, Debug)]
pub struct StoreArgs {
    /// Store config file (default: <config dir>/qpolicy/config.yaml).
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Serve the store from this policy directory, ignoring the config.
    #[arg(long, global = true, value_name = "DIR", conflicts_with = "config")]
    pub store_dir: Option<PathBuf>,
}

impl StoreArgs {
    pub fn connect(&self) -> Result<Box<dyn PolicyAdmin>> {
        if let Some(dir) = &self.store_dir {
            tracing::debug!(dir = %dir.display(), "serving store from policy directory");
            return Ok(Box::new(DirectoryAdmin::new(dir.clone())));
        }
        let config = StoreConfig::load_or_default(self.config.as_deref())
            .context("failed to load store config")?;
        tracing::debug!(?config, "store config loaded");
        Ok(config.connect())
    }
}
