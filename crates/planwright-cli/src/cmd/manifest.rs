use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use planwright_core::{
    clock, config,
    manifest::{self, FeatureManifest, MigrationChange},
    migration_log,
};
use std::path::Path;

#[derive(Subcommand)]
pub enum ManifestSubcommand {
    /// Compare the project config with the manifest
    DiffConfig,
    /// Check the project config; type and enum mismatches make it invalid
    Validate,
    /// Add missing sections and fields, coerce unambiguous types
    ApplyMigration {
        /// Report the changes without writing config.json
        #[arg(long)]
        dry_run: bool,
        /// Also record the run in migration-log.md; ignored with --dry-run
        #[arg(long)]
        log: bool,
    },
    /// Record a migration in migration-log.md
    LogMigration {
        /// JSON array of changes as printed by apply-migration
        #[arg(long)]
        changes: String,
        /// Manifest version before the migration
        #[arg(long)]
        from: Option<u64>,
        /// Manifest version after the migration
        #[arg(long)]
        to: Option<u32>,
    },
    /// Detect feature values from files in the project root
    AutoDetect {
        /// Feature name or config key
        feature: String,
    },
}

pub fn run(
    root: &Path,
    manifest_path: Option<&Path>,
    subcmd: ManifestSubcommand,
) -> anyhow::Result<()> {
    let manifest = FeatureManifest::load(manifest_path)
        .context("failed to load feature manifest")?;

    match subcmd {
        ManifestSubcommand::DiffConfig => {
            let cfg = config::load_or_default(root).context("failed to load config.json")?;
            print_json(&manifest::diff_config(&manifest, &cfg))
        }
        ManifestSubcommand::Validate => {
            let cfg = config::load_or_default(root).context("failed to load config.json")?;
            print_json(&manifest::validate(&manifest, &cfg))
        }
        ManifestSubcommand::ApplyMigration { dry_run, log } => {
            apply_migration(root, &manifest, dry_run, log)
        }
        ManifestSubcommand::LogMigration { changes, from, to } => {
            let changes: Vec<MigrationChange> =
                serde_json::from_str(&changes).context("--changes must be a JSON array of changes")?;
            let to = to.unwrap_or(manifest.manifest_version);
            let entry = migration_log::log_migration(root, &clock::today(), from, to, &changes)
                .context("failed to write migration-log.md")?;
            print_json(&serde_json::json!({
                "logged": true,
                "change_count": changes.len(),
                "entry": entry,
            }))
        }
        ManifestSubcommand::AutoDetect { feature } => {
            let spec = manifest.feature(&feature)?;
            let detected = manifest::auto_detect(spec, root);
            print_json(&serde_json::json!({
                "feature": feature,
                "config_key": spec.config_key,
                "detected": detected,
            }))
        }
    }
}

fn apply_migration(
    root: &Path,
    manifest: &FeatureManifest,
    dry_run: bool,
    log: bool,
) -> anyhow::Result<()> {
    let mut cfg = config::load_or_default(root).context("failed to load config.json")?;
    let report = manifest::apply_migration(manifest, &mut cfg);

    let written = !dry_run && report.changed();
    if written {
        config::save(root, &cfg).context("failed to write config.json")?;
    }
    // Dry runs are never logged.
    let logged = if log && !dry_run {
        migration_log::log_migration(
            root,
            &clock::today(),
            report.from_version,
            report.to_version,
            &report.changes,
        )
        .context("failed to write migration-log.md")?;
        true
    } else {
        false
    };

    print_json(&serde_json::json!({
        "from_version": report.from_version,
        "to_version": report.to_version,
        "change_count": report.changes.len(),
        "changes": report.changes,
        "dry_run": dry_run,
        "written": written,
        "logged": logged,
    }))
}
