//! Append-only markdown record of config migrations, newest entry first.

use crate::document::{read_optional, write_document_atomic};
use crate::error::Result;
use crate::manifest::MigrationChange;
use crate::paths;
use std::path::Path;

const HEADER: &str = "# Migration Log\n\nConfig migrations applied to this project, newest first.\n";

/// One markdown bullet (without the leading `- `) per change.
pub fn describe(change: &MigrationChange) -> String {
    match change {
        MigrationChange::FeatureAdded {
            config_key,
            fields_added,
            ..
        } => format!("Added `{config_key}` section ({})", fields_added.join(", ")),
        MigrationChange::FieldAdded {
            config_key,
            field,
            default_value,
            ..
        } => format!("Added `{config_key}.{field}` (default: {default_value})"),
        MigrationChange::TypeCoerced {
            config_key,
            field,
            from,
            to,
            ..
        } => format!("Coerced `{config_key}.{field}`: {from} -> {to}"),
        MigrationChange::ManifestVersionUpdated { from, to } => {
            let from = from.map_or_else(|| "none".to_string(), |v| v.to_string());
            format!("Updated `manifest_version`: {from} -> {to}")
        }
    }
}

/// Render a dated log section for one migration run.
pub fn render_entry(date: &str, from: Option<u64>, to: u32, changes: &[MigrationChange]) -> String {
    let from = from.unwrap_or(0);
    let mut out = format!("## {date}: manifest v{from} -> v{to}\n\n");
    if changes.is_empty() {
        out.push_str("- No changes\n");
    }
    for change in changes {
        out.push_str("- ");
        out.push_str(&describe(change));
        out.push('\n');
    }
    out
}

/// Insert `entry` after the log header so the newest entry comes first.
fn prepend_entry(existing: &str, entry: &str) -> String {
    let insert_at = existing.find("\n## ").map(|i| i + 1).unwrap_or(existing.len());
    let (head, tail) = existing.split_at(insert_at);
    let mut out = String::with_capacity(existing.len() + entry.len() + 2);
    out.push_str(head);
    if !out.ends_with("\n\n") {
        out.push('\n');
    }
    out.push_str(entry);
    if !tail.is_empty() {
        out.push('\n');
        out.push_str(tail);
    }
    out
}

/// Prepend a migration entry to `.planning/migration-log.md`, creating the
/// file with its header when absent. Returns the written entry.
pub fn log_migration(
    root: &Path,
    date: &str,
    from: Option<u64>,
    to: u32,
    changes: &[MigrationChange],
) -> Result<String> {
    let path = paths::migration_log_path(root);
    let existing = read_optional(&path)?.unwrap_or_else(|| HEADER.to_string());
    let entry = render_entry(date, from, to, changes);
    write_document_atomic(&path, &prepend_entry(&existing, &entry))?;
    tracing::debug!(path = %path.display(), changes = changes.len(), "logged migration");
    Ok(entry)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
