//! The prose `ROADMAP.md` document: one `### Phase {id}: {Name}` section per
//! phase plus an optional `- [ ] **Phase {id}: {Name}**` checklist.
//!
//! All edits are text splices; content outside the touched lines is kept.

use crate::document::{self, read_optional, write_document_atomic, PhaseDir};
use crate::error::Result;
use crate::paths;
use crate::phase::PhaseState;
use crate::phase_id::PhaseId;
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::OnceLock;

pub const INSERTED_MARKER: &str = "(INSERTED)";
const FIRST_PHASE_DEPENDENCY: &str = "Nothing (first phase)";

static HEADER_RE: OnceLock<Regex> = OnceLock::new();
static CHECKLIST_RE: OnceLock<Regex> = OnceLock::new();
static GOAL_RE: OnceLock<Regex> = OnceLock::new();
static DEPENDS_RE: OnceLock<Regex> = OnceLock::new();
static PHASE_REF_RE: OnceLock<Regex> = OnceLock::new();
static PLAN_REF_RE: OnceLock<Regex> = OnceLock::new();

fn header_re() -> &'static Regex {
    HEADER_RE.get_or_init(|| {
        Regex::new(r"^#{2,4}\s*Phase\s+(\d+(?:\.\d+)?)\s*:\s*(.*?)\s*$").unwrap()
    })
}

fn checklist_re() -> &'static Regex {
    CHECKLIST_RE.get_or_init(|| {
        Regex::new(r"^\s*-\s*\[([ xX])\]\s*\*\*Phase\s+(\d+(?:\.\d+)?)\s*:\s*(.*?)\*\*").unwrap()
    })
}

fn goal_re() -> &'static Regex {
    GOAL_RE.get_or_init(|| Regex::new(r"^\*\*Goal:?\*\*:?\s*(.+?)\s*$").unwrap())
}

fn depends_re() -> &'static Regex {
    DEPENDS_RE.get_or_init(|| Regex::new(r"^\*\*Depends on:?\*\*:?\s*(.+?)\s*$").unwrap())
}

fn phase_ref_re() -> &'static Regex {
    PHASE_REF_RE.get_or_init(|| Regex::new(r"\bPhase(\s+)(\d+(?:\.\d+)?)\b").unwrap())
}

fn plan_ref_re() -> &'static Regex {
    PLAN_REF_RE
        .get_or_init(|| Regex::new(r"\b(\d+(?:\.\d+)?)-(\d{2,})-(PLAN|SUMMARY)\b").unwrap())
}

/// Lines of `content` with their byte offsets (start, end including newline).
fn lines_with_offsets(content: &str) -> impl Iterator<Item = (usize, usize, &str)> {
    let mut offset = 0;
    content.split_inclusive('\n').map(move |raw| {
        let start = offset;
        offset += raw.len();
        (start, offset, raw.trim_end_matches(['\n', '\r']))
    })
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoadmapSection {
    pub id: PhaseId,
    pub name: String,
    pub inserted: bool,
    pub goal: Option<String>,
    pub depends_on: Option<String>,
    /// Byte range of the section within the roadmap.
    #[serde(skip)]
    pub start: usize,
    #[serde(skip)]
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChecklistEntry {
    pub id: PhaseId,
    pub name: String,
    pub checked: bool,
    #[serde(skip)]
    pub start: usize,
    #[serde(skip)]
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Roadmap {
    content: String,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

impl Roadmap {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    pub fn load(root: &Path) -> Result<Option<Self>> {
        Ok(read_optional(&paths::roadmap_path(root))?.map(Self::new))
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        write_document_atomic(&paths::roadmap_path(root), &self.content)
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn into_content(self) -> String {
        self.content
    }

    pub fn sections(&self) -> Vec<RoadmapSection> {
        let mut sections: Vec<RoadmapSection> = Vec::new();
        let mut open: Option<RoadmapSection> = None;
        for (start, end, line) in lines_with_offsets(&self.content) {
            let header = header_re().captures(line);
            let closes = header.is_some() || line.starts_with("## ") || line == "##";
            if closes {
                if let Some(mut section) = open.take() {
                    section.end = start;
                    sections.push(section);
                }
            }
            if let Some(caps) = header {
                let Ok(id) = caps[1].parse::<PhaseId>() else {
                    continue;
                };
                let raw_name = caps[2].trim();
                let (name, inserted) = match raw_name.strip_suffix(INSERTED_MARKER) {
                    Some(n) => (n.trim_end().to_string(), true),
                    None => (raw_name.to_string(), false),
                };
                open = Some(RoadmapSection {
                    id,
                    name,
                    inserted,
                    goal: None,
                    depends_on: None,
                    start,
                    end,
                });
                continue;
            }
            if let Some(section) = open.as_mut() {
                let trimmed = line.trim();
                if section.goal.is_none() {
                    if let Some(c) = goal_re().captures(trimmed) {
                        section.goal = Some(c[1].to_string());
                    }
                }
                if section.depends_on.is_none() {
                    if let Some(c) = depends_re().captures(trimmed) {
                        section.depends_on = Some(c[1].to_string());
                    }
                }
            }
        }
        if let Some(mut section) = open.take() {
            section.end = self.content.len();
            sections.push(section);
        }
        sections
    }

    pub fn section(&self, id: PhaseId) -> Option<RoadmapSection> {
        self.sections().into_iter().find(|s| s.id == id)
    }

    pub fn section_text(&self, section: &RoadmapSection) -> &str {
        &self.content[section.start..section.end]
    }

    pub fn checklist(&self) -> Vec<ChecklistEntry> {
        lines_with_offsets(&self.content)
            .filter_map(|(start, end, line)| {
                let caps = checklist_re().captures(line)?;
                Some(ChecklistEntry {
                    id: caps[2].parse().ok()?,
                    name: caps[3].trim().to_string(),
                    checked: &caps[1] != " ",
                    start,
                    end,
                })
            })
            .collect()
    }

    /// Every phase id named by a section header or checklist line.
    pub fn phase_ids(&self) -> BTreeSet<PhaseId> {
        self.sections()
            .iter()
            .map(|s| s.id)
            .chain(self.checklist().iter().map(|c| c.id))
            .collect()
    }

    pub fn is_checked(&self, id: PhaseId) -> bool {
        self.checklist().iter().any(|c| c.id == id && c.checked)
    }
}

// ---------------------------------------------------------------------------
// Edits
// ---------------------------------------------------------------------------

fn section_block(id: PhaseId, name: &str, inserted: bool, depends_on: Option<PhaseId>) -> String {
    let marker = if inserted {
        format!(" {INSERTED_MARKER}")
    } else {
        String::new()
    };
    let depends = match depends_on {
        Some(dep) => format!("Phase {}", dep.label()),
        None => FIRST_PHASE_DEPENDENCY.to_string(),
    };
    format!(
        "### Phase {}: {name}{marker}\n\n**Goal:** [To be planned]\n**Depends on:** {depends}\n**Plans:** 0 plans\n",
        id.label()
    )
}

fn checklist_line(id: PhaseId, name: &str, inserted: bool) -> String {
    let marker = if inserted {
        format!(" {INSERTED_MARKER}")
    } else {
        String::new()
    };
    format!("- [ ] **Phase {}: {name}**{marker}\n", id.label())
}

impl Roadmap {
    fn splice_in(&mut self, pos: usize, text: &str) {
        self.content.insert_str(pos, text);
    }

    /// Insert a whole section at `pos`, keeping one blank line on each side.
    fn insert_block(&mut self, pos: usize, block: &str) {
        let before = &self.content[..pos];
        let lead = if before.is_empty() || before.ends_with("\n\n") {
            ""
        } else if before.ends_with('\n') {
            "\n"
        } else {
            "\n\n"
        };
        let tail = if pos < self.content.len() { "\n" } else { "" };
        let text = format!("{lead}{block}{tail}");
        self.splice_in(pos, &text);
    }

    fn insert_checklist_line(&mut self, after: Option<&ChecklistEntry>, line: &str) {
        if let Some(entry) = after {
            let mut text = line.to_string();
            if !self.content[..entry.end].ends_with('\n') {
                text.insert(0, '\n');
            }
            self.splice_in(entry.end, &text);
            return;
        }
        let heading = lines_with_offsets(&self.content)
            .find(|(_, _, l)| l.trim() == "## Phases")
            .map(|(_, end, _)| end);
        if let Some(end) = heading {
            self.splice_in(end, &format!("\n{line}"));
        }
    }

    /// Append a new integer phase after the last phase section.
    pub fn append_phase(&mut self, id: PhaseId, name: &str, depends_on: Option<PhaseId>) {
        let checklist = self.checklist();
        self.insert_checklist_line(checklist.last(), &checklist_line(id, name, false));

        let pos = self
            .sections()
            .last()
            .map(|s| s.end)
            .unwrap_or(self.content.len());
        self.insert_block(pos, &section_block(id, name, false, depends_on));
    }

    /// Insert a decimal phase after `anchor` and any of its existing decimal
    /// children, marked `(INSERTED)`.
    pub fn insert_phase_after(&mut self, anchor: PhaseId, id: PhaseId, name: &str) {
        let in_family = |other: PhaseId| other.major() == anchor.major() && other < id;

        let checklist = self.checklist();
        let after_entry = checklist.iter().filter(|c| in_family(c.id)).last();
        if after_entry.is_some() || checklist.is_empty() {
            self.insert_checklist_line(after_entry, &checklist_line(id, name, true));
        } else {
            self.insert_checklist_line(checklist.last(), &checklist_line(id, name, true));
        }

        let sections = self.sections();
        let pos = sections
            .iter()
            .filter(|s| in_family(s.id))
            .map(|s| s.end)
            .max()
            .or_else(|| sections.last().map(|s| s.end))
            .unwrap_or(self.content.len());
        self.insert_block(pos, &section_block(id, name, true, Some(anchor)));
    }

    /// Remove the section and checklist line of `id`. Returns true when
    /// anything was removed.
    ///
    /// A section that depended on `id` alone inherits the removed phase's own
    /// dependency, so no section is left pointing at a phase that is gone.
    pub fn remove_phase(&mut self, id: PhaseId) -> bool {
        let inherited = self
            .section(id)
            .and_then(|s| s.depends_on)
            .unwrap_or_else(|| FIRST_PHASE_DEPENDENCY.to_string());
        let mut ranges: Vec<(usize, usize)> = self
            .sections()
            .iter()
            .filter(|s| s.id == id)
            .map(|s| (s.start, s.end))
            .chain(
                self.checklist()
                    .iter()
                    .filter(|c| c.id == id)
                    .map(|c| (c.start, c.end)),
            )
            .collect();
        ranges.sort_by(|a, b| b.0.cmp(&a.0));
        for (start, end) in &ranges {
            self.content.replace_range(*start..*end, "");
        }
        if !ranges.is_empty() {
            self.redirect_dependencies(id, &inherited);
        }
        !ranges.is_empty()
    }

    fn redirect_dependencies(&mut self, removed: PhaseId, inherited: &str) {
        let mut edits = Vec::new();
        for (start, end, line) in lines_with_offsets(&self.content) {
            let Some(value) = depends_re().captures(line.trim()).and_then(|c| c.get(1)) else {
                continue;
            };
            let only_removed = phase_ref_re()
                .captures(value.as_str())
                .filter(|c| c[0].len() == value.as_str().len())
                .and_then(|c| c[2].parse::<PhaseId>().ok())
                == Some(removed);
            if only_removed {
                let newline = &self.content[start..end][line.len()..];
                edits.push((start, end, format!("**Depends on:** {inherited}{newline}")));
            }
        }
        for (start, end, text) in edits.into_iter().rev() {
            self.content.replace_range(start..end, &text);
        }
    }

    /// Rewrite every `Phase {id}` and `{id}-{seq}-PLAN|SUMMARY` reference
    /// through `mapping` in a single pass per pattern.
    pub fn renumber(&mut self, mapping: &BTreeMap<PhaseId, PhaseId>) {
        if mapping.is_empty() {
            return;
        }
        let phases = phase_ref_re().replace_all(&self.content, |caps: &Captures| {
            let text = &caps[2];
            match text.parse::<PhaseId>().ok().and_then(|id| mapping.get(&id)) {
                Some(new) => {
                    let rendered = if text.starts_with('0') {
                        new.padded()
                    } else {
                        new.label()
                    };
                    format!("Phase{}{}", &caps[1], rendered)
                }
                None => caps[0].to_string(),
            }
        });
        let plans = plan_ref_re().replace_all(&phases, |caps: &Captures| {
            match caps[1].parse::<PhaseId>().ok().and_then(|id| mapping.get(&id)) {
                Some(new) => format!("{}-{}-{}", new.padded(), &caps[2], &caps[3]),
                None => caps[0].to_string(),
            }
        });
        self.content = plans.into_owned();
    }

    /// Tick the checklist line of `id` and stamp the completion date.
    pub fn mark_complete(&mut self, id: PhaseId, date: &str) -> bool {
        let Some(entry) = self.checklist().into_iter().find(|c| c.id == id) else {
            return false;
        };
        let line = self.content[entry.start..entry.end].to_string();
        let newline = &line[line.trim_end_matches(['\n', '\r']).len()..];
        let mut body = line.trim_end_matches(['\n', '\r']).to_string();
        if let Some(pos) = body.find("[ ]") {
            body.replace_range(pos..pos + 3, "[x]");
        }
        if !body.contains("(completed") {
            body.push_str(&format!(" (completed {date})"));
        }
        let updated = format!("{body}{newline}");
        if updated == line {
            return false;
        }
        self.content.replace_range(entry.start..entry.end, &updated);
        true
    }
}

/// Initial `ROADMAP.md` written by `init`.
pub fn template(project: &str) -> String {
    format!("# Roadmap: {project}\n\n## Phases\n\n## Phase Details\n")
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct PhaseLookup {
    pub phase_number: String,
    pub phase_name: String,
    pub inserted: bool,
    pub goal: Option<String>,
    pub depends_on: Option<String>,
    pub section: String,
}

/// Find the roadmap section of `id`. `Ok(None)` when the roadmap has no such
/// section; `DocumentNotFound` when there is no roadmap.
pub fn get_phase(root: &Path, id: PhaseId) -> Result<Option<PhaseLookup>> {
    let roadmap = Roadmap::new(document::read_document(&paths::roadmap_path(root))?.content);
    Ok(roadmap.section(id).map(|s| PhaseLookup {
        phase_number: s.id.label(),
        phase_name: s.name.clone(),
        inserted: s.inserted,
        goal: s.goal.clone(),
        depends_on: s.depends_on.clone(),
        section: roadmap.section_text(&s).trim_end().to_string(),
    }))
}

#[derive(Debug, Clone, Serialize)]
pub struct PhaseAnalysis {
    pub number: String,
    pub padded: String,
    pub name: String,
    pub inserted: bool,
    pub goal: Option<String>,
    pub depends_on: Option<String>,
    pub plan_count: usize,
    pub summary_count: usize,
    pub disk_status: PhaseState,
    pub roadmap_complete: bool,
    pub directory: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoadmapAnalysis {
    pub phases: Vec<PhaseAnalysis>,
    pub phase_count: usize,
    pub completed_phases: usize,
    pub total_plans: usize,
    pub total_summaries: usize,
    pub progress_percent: u32,
    pub current_phase: Option<String>,
    pub next_phase: Option<String>,
    /// Checklist entries with no matching detail section.
    pub missing_phase_details: Vec<String>,
}

pub fn analyze(root: &Path) -> Result<RoadmapAnalysis> {
    let roadmap = Roadmap::new(document::read_document(&paths::roadmap_path(root))?.content);
    let dirs = document::list_phase_dirs(root)?;
    let mut sections = roadmap.sections();
    sections.sort_by_key(|s| s.id);

    let mut phases = Vec::with_capacity(sections.len());
    for s in &sections {
        let dir: Option<&PhaseDir> = dirs.iter().find(|d| d.id == s.id);
        let (plan_count, summary_count, disk_status) = match dir {
            Some(d) => {
                let files = d.files()?;
                (
                    files.plan_count(),
                    files.summary_count(),
                    PhaseState::from_files(&files),
                )
            }
            None => (0, 0, PhaseState::NoDirectory),
        };
        phases.push(PhaseAnalysis {
            number: s.id.label(),
            padded: s.id.padded(),
            name: s.name.clone(),
            inserted: s.inserted,
            goal: s.goal.clone(),
            depends_on: s.depends_on.clone(),
            plan_count,
            summary_count,
            disk_status,
            roadmap_complete: roadmap.is_checked(s.id),
            directory: dir.map(|d| d.name.clone()),
        });
    }

    let completed_phases = phases
        .iter()
        .filter(|p| p.disk_status == PhaseState::Complete)
        .count();
    let current = phases
        .iter()
        .position(|p| p.disk_status != PhaseState::Complete);
    let section_ids: BTreeSet<PhaseId> = sections.iter().map(|s| s.id).collect();
    let missing_phase_details = roadmap
        .checklist()
        .iter()
        .filter(|c| !section_ids.contains(&c.id))
        .map(|c| c.id.label())
        .collect();

    Ok(RoadmapAnalysis {
        phase_count: phases.len(),
        completed_phases,
        total_plans: phases.iter().map(|p| p.plan_count).sum(),
        total_summaries: phases.iter().map(|p| p.summary_count).sum(),
        progress_percent: if phases.is_empty() {
            0
        } else {
            (completed_phases * 100 / phases.len()) as u32
        },
        current_phase: current.map(|i| phases[i].number.clone()),
        next_phase: current
            .and_then(|i| phases.get(i + 1))
            .map(|p| p.number.clone()),
        missing_phase_details,
        phases,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
