//! `qpolicy get <name>` — print a policy exactly as stored.

use anyhow::{Context, Result};
use clap::Args;

use qpolicy_store::PolicyStore;

use super::StoreArgs;

/// Arguments for `qpolicy get`.
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Policy name, e.g. `30-user` or `include/admin-ro`.
    pub name: String,
}

impl GetArgs {
    pub fn run(self, store: &StoreArgs) -> Result<()> {
        let admin = store.connect()?;
        let client = PolicyStore::open(admin.as_ref(), &self.name)?;
        let doc = client
            .get()
            .with_context(|| format!("failed to read policy '{}'", client.name()))?;
        print!("{}", doc.content);
        Ok(())
    }
}
