//! Filesystem access for planning documents and phase directories.

use crate::error::{PlanError, Result};
use crate::frontmatter::{self, Frontmatter};
use crate::paths;
use crate::phase_id::PhaseId;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub content: String,
}

impl Document {
    pub fn read(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Self {
                path: path.to_path_buf(),
                content,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(PlanError::DocumentNotFound(path.to_path_buf()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn frontmatter(&self) -> Option<Frontmatter> {
        frontmatter::extract(&self.content)
    }

    pub fn body(&self) -> &str {
        frontmatter::body(&self.content)
    }

    /// Splice `fields` into the document and write it back atomically.
    pub fn write_fields(&mut self, fields: &Frontmatter) -> Result<()> {
        self.content = frontmatter::splice(&self.content, fields);
        write_document_atomic(&self.path, &self.content)
    }
}

pub fn read_document(path: &Path) -> Result<Document> {
    Document::read(path)
}

pub fn write_document_atomic(path: &Path, content: &str) -> Result<()> {
    crate::io::atomic_write(path, content.as_bytes())
}

/// Read a document that may legitimately be absent.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match Document::read(path) {
        Ok(doc) => Ok(Some(doc.content)),
        Err(PlanError::DocumentNotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Read a file reached by a directory scan. `Ok(None)` when the bytes are
/// not UTF-8 text, so the scan can skip it and carry on.
pub fn read_scanned(path: &Path) -> Result<Option<String>> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8(bytes).ok())
}

// ---------------------------------------------------------------------------
// Phase directories
// ---------------------------------------------------------------------------

static PHASE_DIR_RE: OnceLock<Regex> = OnceLock::new();
static PLAN_FILE_RE: OnceLock<Regex> = OnceLock::new();

fn phase_dir_re() -> &'static Regex {
    PHASE_DIR_RE.get_or_init(|| Regex::new(r"^(\d+(?:\.\d+)?)-(.+)$").unwrap())
}

fn plan_file_re() -> &'static Regex {
    PLAN_FILE_RE
        .get_or_init(|| Regex::new(r"^(\d+(?:\.\d+)?)-(\d+)-(PLAN|SUMMARY)\.md$").unwrap())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseDir {
    pub id: PhaseId,
    pub slug: String,
    /// Directory name, `{id}-{slug}`.
    pub name: String,
    #[serde(skip)]
    pub path: PathBuf,
}

impl PhaseDir {
    pub fn files(&self) -> Result<PhaseFiles> {
        scan_phase_files(&self.path)
    }
}

/// Split a directory name like `02.1-hotfix` into its id and slug.
pub fn parse_phase_dir_name(name: &str) -> Option<(PhaseId, &str)> {
    let caps = phase_dir_re().captures(name)?;
    let id = caps.get(1)?.as_str().parse().ok()?;
    Some((id, caps.get(2)?.as_str()))
}

/// On-disk phase directories sorted by numeric phase order.
pub fn list_phase_dirs(root: &Path) -> Result<Vec<PhaseDir>> {
    let dir = paths::phases_dir(root);
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut phases = Vec::new();
    for entry in std::fs::read_dir(&dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some((id, slug)) = parse_phase_dir_name(&name) {
            phases.push(PhaseDir {
                id,
                slug: slug.to_string(),
                path: entry.path(),
                name,
            });
        }
    }
    phases.sort_by(|a, b| a.id.cmp(&b.id).then_with(|| a.name.cmp(&b.name)));
    Ok(phases)
}

pub fn find_phase_dir(root: &Path, id: PhaseId) -> Result<Option<PhaseDir>> {
    Ok(list_phase_dirs(root)?.into_iter().find(|p| p.id == id))
}

// ---------------------------------------------------------------------------
// Files inside a phase directory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanFile {
    pub seq: u32,
    pub file_name: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PhaseFiles {
    pub plans: Vec<PlanFile>,
    pub summaries: Vec<PlanFile>,
    /// Every regular file name in the directory, sorted.
    pub all: Vec<String>,
}

pub fn scan_phase_files(dir: &Path) -> Result<PhaseFiles> {
    let mut files = PhaseFiles::default();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(caps) = plan_file_re().captures(&name) {
            if let Ok(seq) = caps[2].parse::<u32>() {
                let file = PlanFile {
                    seq,
                    file_name: name.clone(),
                };
                match &caps[3] {
                    "PLAN" => files.plans.push(file),
                    _ => files.summaries.push(file),
                }
            }
        }
        files.all.push(name);
    }
    files.plans.sort_by_key(|p| p.seq);
    files.summaries.sort_by_key(|p| p.seq);
    files.all.sort();
    Ok(files)
}

impl PhaseFiles {
    pub fn plan_count(&self) -> usize {
        self.plans.len()
    }

    pub fn summary_count(&self) -> usize {
        self.summaries.len()
    }

    /// Every `*-SUMMARY.md` in the directory, sequenced or not.
    pub fn any_summary_count(&self) -> usize {
        self.all.iter().filter(|n| n.ends_with("-SUMMARY.md")).count()
    }

    pub fn has_summary(&self, seq: u32) -> bool {
        self.summaries.iter().any(|s| s.seq == seq)
    }

    /// Plans that have a matching summary.
    pub fn executed_count(&self) -> usize {
        self.plans.iter().filter(|p| self.has_summary(p.seq)).count()
    }

    pub fn plans_missing_summary(&self) -> Vec<&PlanFile> {
        self.plans.iter().filter(|p| !self.has_summary(p.seq)).collect()
    }

    pub fn orphan_summaries(&self) -> Vec<&PlanFile> {
        self.summaries
            .iter()
            .filter(|s| !self.plans.iter().any(|p| p.seq == s.seq))
            .collect()
    }

    /// Sequence numbers missing from a `1..=max` plan run.
    pub fn plan_gaps(&self) -> Vec<u32> {
        let max = self.plans.iter().map(|p| p.seq).max().unwrap_or(0);
        (1..=max)
            .filter(|seq| !self.plans.iter().any(|p| p.seq == *seq))
            .collect()
    }

    /// Reject numbering that renumbering would have to guess about: plan
    /// sequences must run `1..=n` without gaps or duplicates, and every
    /// summary must belong to a plan.
    pub fn ensure_contiguous(&self, phase: PhaseId) -> Result<()> {
        let seqs: Vec<u32> = self.plans.iter().map(|p| p.seq).collect();
        let expected: Vec<u32> = (1..=seqs.len() as u32).collect();
        if seqs != expected {
            return Err(PlanError::NonContiguousPlans {
                phase: phase.padded(),
                kind: "plan".to_string(),
                found: join_seqs(&seqs),
            });
        }
        let orphans = self.orphan_summaries();
        if !orphans.is_empty() {
            let seqs: Vec<u32> = orphans.iter().map(|s| s.seq).collect();
            return Err(PlanError::NonContiguousPlans {
                phase: phase.padded(),
                kind: "summary".to_string(),
                found: join_seqs(&seqs),
            });
        }
        Ok(())
    }
}

fn join_seqs(seqs: &[u32]) -> String {
    seqs.iter()
        .map(|s| format!("{s:02}"))
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
