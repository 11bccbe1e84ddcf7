use crate::output::{print_found, print_json, print_not_found};
use anyhow::{bail, Context};
use clap::Subcommand;
use planwright_core::{
    config,
    document::{self, Document},
    frontmatter::{self, Frontmatter, Value},
    PlanError,
};
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum FrontmatterSubcommand {
    /// Print a document's frontmatter as JSON
    Get {
        file: PathBuf,
        /// Print only this field
        #[arg(long)]
        field: Option<String>,
    },
    /// Set one field, leaving every other byte of the document alone
    Set {
        file: PathBuf,
        #[arg(long)]
        field: String,
        /// JSON literal or plain string
        #[arg(long)]
        value: String,
    },
    /// Set every key of a JSON object
    Merge {
        file: PathBuf,
        /// JSON object, e.g. '{"status": "complete"}'
        #[arg(long)]
        data: String,
    },
}

pub fn run(root: &Path, subcmd: FrontmatterSubcommand) -> anyhow::Result<()> {
    match subcmd {
        FrontmatterSubcommand::Get { file, field } => get(&root.join(file), field.as_deref()),
        FrontmatterSubcommand::Set { file, field, value } => {
            let value = Value::from_json(&config::parse_value(&value));
            update(&root.join(file), |fm| fm.set(field.clone(), value.clone()))
        }
        FrontmatterSubcommand::Merge { file, data } => {
            let data: serde_json::Value =
                serde_json::from_str(&data).context("--data must be valid JSON")?;
            let Some(map) = data.as_object() else {
                bail!("--data must be a JSON object");
            };
            update(&root.join(file), |fm| fm.merge_json(map))
        }
    }
}

fn get(path: &Path, field: Option<&str>) -> anyhow::Result<()> {
    let doc = match document::read_document(path) {
        Ok(doc) => doc,
        Err(e @ PlanError::DocumentNotFound(_)) => return print_not_found(e),
        Err(e) => return Err(e).context("failed to read document"),
    };
    let fm = frontmatter::try_extract(&doc.content)
        .with_context(|| format!("malformed frontmatter in {}", path.display()))?
        .unwrap_or_default();
    match field {
        Some(key) => match fm.get(key) {
            Some(v) => print_found(serde_json::json!({ "field": key, "value": v.to_json() })),
            None => print_not_found(format!("field '{key}' not found in {}", path.display())),
        },
        None => print_json(&fm.to_json()),
    }
}

fn update(path: &Path, apply: impl FnOnce(&mut Frontmatter)) -> anyhow::Result<()> {
    let mut doc = Document::read(path).context("failed to read document")?;
    let mut fm = frontmatter::try_extract(&doc.content)
        .with_context(|| format!("malformed frontmatter in {}", path.display()))?
        .unwrap_or_default();
    apply(&mut fm);
    doc.write_fields(&fm)
        .with_context(|| format!("failed to write {}", path.display()))?;
    print_json(&serde_json::json!({
        "updated": true,
        "path": path.display().to_string(),
        "frontmatter": fm.to_json(),
    }))
}
