//! Cross-check `ROADMAP.md` against the phase directories on disk.

use crate::document::{self, PhaseDir};
use crate::error::Result;
use crate::frontmatter;
use crate::paths;
use crate::phase_id::PhaseId;
use crate::roadmap::Roadmap;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConsistencyReport {
    pub passed: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub warning_count: usize,
}

/// Structural problems are errors; drift between the roadmap and the
/// directories is reported as warnings and does not fail the check.
pub fn validate_consistency(root: &Path) -> Result<ConsistencyReport> {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let roadmap = Roadmap::load(root)?;
    if roadmap.is_none() {
        errors.push("ROADMAP.md not found".to_string());
    }
    if !paths::phases_dir(root).is_dir() {
        errors.push("phases directory not found".to_string());
    }

    let dirs = document::list_phase_dirs(root)?;
    let mut by_id: BTreeMap<PhaseId, Vec<&PhaseDir>> = BTreeMap::new();
    for dir in &dirs {
        by_id.entry(dir.id).or_default().push(dir);
    }
    for (id, group) in &by_id {
        if group.len() > 1 {
            let names: Vec<&str> = group.iter().map(|d| d.name.as_str()).collect();
            warnings.push(format!(
                "Phase {} has multiple directories: {}",
                id.padded(),
                names.join(", ")
            ));
        }
    }

    if let Some(roadmap) = &roadmap {
        let planned = roadmap.phase_ids();
        for id in &planned {
            if !by_id.contains_key(id) {
                warnings.push(format!(
                    "Phase {} is in ROADMAP.md but has no directory",
                    id.label()
                ));
            }
        }
        for dir in &dirs {
            if !planned.contains(&dir.id) {
                warnings.push(format!(
                    "Directory {} has no ROADMAP.md entry",
                    dir.name
                ));
            }
        }
    }

    let integers: BTreeSet<u32> = dirs.iter().map(|d| d.id.major()).collect();
    let mut previous: Option<u32> = None;
    for major in &integers {
        let start = previous.map_or(1, |p| p + 1);
        for missing in start..*major {
            warnings.push(format!(
                "Gap in phase numbering: {} is missing",
                PhaseId::integer(missing).padded()
            ));
        }
        previous = Some(*major);
    }

    for dir in &dirs {
        check_phase_files(dir, &mut warnings)?;
    }

    let warning_count = warnings.len();
    Ok(ConsistencyReport {
        passed: errors.is_empty(),
        errors,
        warnings,
        warning_count,
    })
}

fn check_phase_files(dir: &PhaseDir, warnings: &mut Vec<String>) -> Result<()> {
    let files = dir.files()?;
    for gap in files.plan_gaps() {
        warnings.push(format!(
            "Gap in plan numbering in {}: {}-{gap:02}-PLAN.md is missing",
            dir.name,
            dir.id.padded()
        ));
    }
    for orphan in files.orphan_summaries() {
        warnings.push(format!(
            "{}/{} has no matching plan",
            dir.name, orphan.file_name
        ));
    }
    for plan in &files.plans {
        let Some(content) = document::read_scanned(&dir.path.join(&plan.file_name))? else {
            warnings.push(format!(
                "{}/{} is not valid UTF-8",
                dir.name, plan.file_name
            ));
            continue;
        };
        match frontmatter::try_extract(&content) {
            Ok(Some(_)) => {}
            Ok(None) => warnings.push(format!(
                "{}/{} has no frontmatter",
                dir.name, plan.file_name
            )),
            Err(e) => warnings.push(format!(
                "{}/{} has malformed frontmatter: {e}",
                dir.name, plan.file_name
            )),
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
