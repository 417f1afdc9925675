//! `qpolicy list [--include]` — names in one policy namespace.

use anyhow::{Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use qpolicy_core::PolicyCategory;
use qpolicy_store::list_names;

use super::StoreArgs;

/// Arguments for `qpolicy list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// List include policies instead of ordinary ones.
    #[arg(long)]
    pub include: bool,
}

#[derive(Tabled)]
struct PolicyRow {
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "category")]
    category: String,
}

impl ListArgs {
    pub fn run(self, store: &StoreArgs) -> Result<()> {
        let category = if self.include {
            PolicyCategory::Include
        } else {
            PolicyCategory::Ordinary
        };
        let admin = store.connect()?;
        let names = list_names(admin.as_ref(), category)
            .with_context(|| format!("failed to list {category} policies"))?;

        if names.is_empty() {
            println!("No {category} policies.");
            return Ok(());
        }

        let rows: Vec<PolicyRow> = names
            .iter()
            .map(|name| PolicyRow {
                name: name.to_string(),
                category: name.category().to_string(),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}
