//! Scaffold a `.planning/` tree for a new project.

use crate::config;
use crate::error::Result;
use crate::io;
use crate::manifest::{self, FeatureManifest};
use crate::paths;
use crate::roadmap;
use crate::state;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize)]
pub struct InitReport {
    pub root: String,
    pub created: Vec<String>,
    pub existing: Vec<String>,
    pub config_written: bool,
    pub detected_fields: usize,
}

impl InitReport {
    fn note(&mut self, rel: &str, created: bool) {
        if created {
            self.created.push(rel.to_string());
        } else {
            self.existing.push(rel.to_string());
        }
    }
}

/// Create whatever part of the planning tree is missing. Existing files are
/// never overwritten, so running this twice is harmless.
pub fn init_project(root: &Path, project: &str, manifest: &FeatureManifest, date: &str) -> Result<InitReport> {
    let mut report = InitReport {
        root: root.display().to_string(),
        ..InitReport::default()
    };

    for rel in [paths::PLANNING_DIR, paths::PHASES_DIR, paths::BACKLOG_DIR] {
        let dir = root.join(rel);
        let existed = dir.is_dir();
        io::ensure_dir(&dir)?;
        report.note(rel, !existed);
    }

    let created = io::write_if_missing(
        &paths::roadmap_path(root),
        roadmap::template(project).as_bytes(),
    )?;
    report.note(paths::ROADMAP_FILE, created);

    let created = io::write_if_missing(
        &paths::state_path(root),
        state::template(project, date).as_bytes(),
    )?;
    report.note(paths::STATE_FILE, created);

    if config::load(root)?.is_none() {
        let mut cfg = config::ConfigMap::new();
        manifest::apply_migration(manifest, &mut cfg);
        report.detected_fields = manifest::apply_auto_detect(manifest, &mut cfg, root);
        config::save(root, &cfg)?;
        report.config_written = true;
        report.note(paths::CONFIG_FILE, true);
    } else {
        report.note(paths::CONFIG_FILE, false);
    }

    tracing::debug!(created = report.created.len(), "initialized planning tree");
    Ok(report)
}
