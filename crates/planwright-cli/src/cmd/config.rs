use crate::output::{print_found, print_json, print_not_found};
use anyhow::Context;
use clap::Subcommand;
use planwright_core::{config, PlanError};
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the whole config.json
    Show,

    /// Read a value by dotted key (e.g. workflow.research)
    Get { key: String },

    /// Set a value by dotted key; JSON literals keep their type
    Set { key: String, value: String },
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: ConfigSubcommand) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => {
            let cfg = config::load(root)
                .context("failed to load config.json")?
                .ok_or(PlanError::NotInitialized)?;
            print_json(&cfg)
        }
        ConfigSubcommand::Get { key } => get(root, &key),
        ConfigSubcommand::Set { key, value } => set(root, &key, &value),
    }
}

fn get(root: &Path, key: &str) -> anyhow::Result<()> {
    let cfg = config::load(root)
        .context("failed to load config.json")?
        .ok_or(PlanError::NotInitialized)?;
    match config::get_path(&cfg, key) {
        Some(value) => print_found(serde_json::json!({ "key": key, "value": value })),
        None => print_not_found(format!("config key '{key}' is not set")),
    }
}

fn set(root: &Path, key: &str, raw: &str) -> anyhow::Result<()> {
    let mut cfg = config::load_or_default(root).context("failed to load config.json")?;
    let value = config::parse_value(raw);
    let previous = config::set_path(&mut cfg, key, value.clone())
        .with_context(|| format!("cannot set '{key}'"))?;
    config::save(root, &cfg).context("failed to write config.json")?;
    print_json(&serde_json::json!({
        "updated": true,
        "key": key,
        "value": value,
        "previous": previous,
    }))
}
