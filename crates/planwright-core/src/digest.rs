//! Roll-up of SUMMARY frontmatter across every phase.

use crate::document;
use crate::error::Result;
use crate::frontmatter::{self, Frontmatter};
use crate::phase_id::PhaseId;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct PhaseDigest {
    pub phase: PhaseId,
    pub directory: String,
    pub summaries: Vec<String>,
    pub provides: Vec<String>,
    pub key_decisions: Vec<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SummaryDigest {
    pub summary_count: usize,
    pub phases: Vec<PhaseDigest>,
    /// Every tag seen, deduplicated and sorted.
    pub tags: Vec<String>,
    /// `{directory}/{file}` for summaries whose frontmatter is missing or
    /// malformed.
    pub skipped: Vec<String>,
}

fn push_unique(into: &mut Vec<String>, fm: &Frontmatter, key: &str) {
    for item in fm.get(key).map(|v| v.string_items()).unwrap_or_default() {
        if !into.contains(&item) {
            into.push(item);
        }
    }
}

pub fn digest(root: &Path) -> Result<SummaryDigest> {
    let mut out = SummaryDigest::default();
    let mut all_tags = BTreeSet::new();
    for dir in document::list_phase_dirs(root)? {
        let files = dir.files()?;
        if files.summaries.is_empty() {
            continue;
        }
        let mut phase = PhaseDigest {
            phase: dir.id,
            directory: dir.name.clone(),
            summaries: Vec::new(),
            provides: Vec::new(),
            key_decisions: Vec::new(),
            tags: Vec::new(),
        };
        for summary in &files.summaries {
            let Some(content) = document::read_scanned(&dir.path.join(&summary.file_name))? else {
                tracing::warn!(file = %summary.file_name, "skipping summary that is not UTF-8");
                out.skipped.push(format!("{}/{}", dir.name, summary.file_name));
                continue;
            };
            let fm = match frontmatter::try_extract(&content) {
                Ok(Some(fm)) => fm,
                Ok(None) => {
                    tracing::warn!(file = %summary.file_name, "summary has no frontmatter");
                    out.skipped.push(format!("{}/{}", dir.name, summary.file_name));
                    continue;
                }
                Err(e) => {
                    tracing::warn!(file = %summary.file_name, error = %e, "skipping malformed summary");
                    out.skipped.push(format!("{}/{}", dir.name, summary.file_name));
                    continue;
                }
            };
            push_unique(&mut phase.provides, &fm, "provides");
            push_unique(&mut phase.key_decisions, &fm, "key_decisions");
            push_unique(&mut phase.tags, &fm, "tags");
            phase.summaries.push(summary.file_name.clone());
            out.summary_count += 1;
        }
        all_tags.extend(phase.tags.iter().cloned());
        if !phase.summaries.is_empty() {
            out.phases.push(phase);
        }
    }
    out.tags = all_tags.into_iter().collect();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = paths::phases_dir(root).join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn aggregates_by_phase_and_skips_malformed() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(
            root,
            "01-core/01-01-SUMMARY.md",
            "---\nprovides: [schema, migrations]\nkey_decisions:\n  - \"Use SQLite: simple ops\"\ntags: [db]\n---\n# Summary\n",
        );
        write(
            root,
            "01-core/01-02-SUMMARY.md",
            "---\nprovides: [schema, seed data]\ntags: [db, tooling]\n---\n",
        );
        write(root, "02-api/02-01-SUMMARY.md", "---\ntags: [unterminated\n---\n");
        write(root, "02-api/02-02-SUMMARY.md", "plain text\n");
        write(root, "03-ui/03-01-PLAN.md", "---\nwave: 1\n---\n");

        let d = digest(root).unwrap();
        assert_eq!(d.summary_count, 2);
        assert_eq!(d.phases.len(), 1);
        let core = &d.phases[0];
        assert_eq!(core.provides, ["schema", "migrations", "seed data"]);
        assert_eq!(core.key_decisions, ["Use SQLite: simple ops"]);
        assert_eq!(d.tags, ["db", "tooling"]);
        assert_eq!(
            d.skipped,
            ["02-api/02-01-SUMMARY.md", "02-api/02-02-SUMMARY.md"]
        );
    }

    #[test]
    fn non_utf8_summary_is_skipped() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "01-core/01-01-SUMMARY.md", "---\nprovides: [schema]\n---\n");
        let bad = paths::phases_dir(root).join("01-core/01-02-SUMMARY.md");
        std::fs::write(bad, [0xff, 0xfe]).unwrap();

        let d = digest(root).unwrap();
        assert_eq!(d.summary_count, 1);
        assert_eq!(d.phases[0].provides, ["schema"]);
        assert_eq!(d.skipped, ["01-core/01-02-SUMMARY.md"]);
    }
}
