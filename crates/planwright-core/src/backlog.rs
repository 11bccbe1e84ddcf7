//! Backlog of ideas parked outside the phase plan.
//!
//! Each item is a markdown document at `.planning/backlog/{id}-{slug}.md`
//! whose frontmatter carries the item's metadata. Every mutation goes
//! through [`frontmatter::splice`], so untouched fields and the body keep
//! their exact bytes.

use crate::document::{self, write_document_atomic, Document};
use crate::error::{PlanError, Result};
use crate::frontmatter::{self, Frontmatter, Value};
use crate::paths;
use crate::phase;
use crate::phase_id::PhaseId;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

static ITEM_FILE_RE: OnceLock<Regex> = OnceLock::new();

fn item_file_re() -> &'static Regex {
    ITEM_FILE_RE.get_or_init(|| Regex::new(r"^B(\d+)-.*\.md$").unwrap())
}

// ---------------------------------------------------------------------------
// Status / Priority
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Open,
    Triaged,
    Promoted,
    Dropped,
}

impl Status {
    pub const ALL: [Status; 4] = [Status::Open, Status::Triaged, Status::Promoted, Status::Dropped];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Open => "open",
            Status::Triaged => "triaged",
            Status::Promoted => "promoted",
            Status::Dropped => "dropped",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self> {
        Status::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| {
                PlanError::InvalidValue(format!(
                    "unknown status '{s}': expected open, triaged, promoted or dropped"
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self> {
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                PlanError::InvalidValue(format!(
                    "unknown priority '{s}': expected high, medium or low"
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// BacklogItem
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacklogItem {
    pub id: String,
    pub title: String,
    pub status: Status,
    pub priority: Priority,
    pub group: Option<String>,
    pub tags: Vec<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub promoted_to: Option<String>,
    pub file: String,
}

impl BacklogItem {
    fn from_frontmatter(fm: &Frontmatter, file: &str) -> Option<Self> {
        let text = |key: &str| fm.get_str(key).map(str::to_string);
        Some(Self {
            id: text("id")?,
            title: text("title")?,
            status: fm.get_str("status").unwrap_or("open").parse().ok()?,
            priority: fm.get_str("priority").unwrap_or("medium").parse().ok()?,
            group: text("group"),
            tags: fm.get("tags").map(Value::string_items).unwrap_or_default(),
            created: text("created"),
            updated: text("updated"),
            promoted_to: fm.get("promoted_to").and_then(|v| v.string_items().pop()),
            file: file.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BacklogScan {
    pub items: Vec<BacklogItem>,
    /// Files that could not be read as backlog items.
    pub skipped: Vec<String>,
}

fn is_item_file(name: &str) -> bool {
    name.ends_with(".md") && name != "INDEX.md"
}

/// Read every item under `.planning/backlog/`, sorted by id. Malformed
/// documents are logged and listed in `skipped`.
pub fn scan(root: &Path) -> Result<BacklogScan> {
    let dir = paths::backlog_dir(root);
    let mut out = BacklogScan::default();
    if !dir.is_dir() {
        return Ok(out);
    }
    let mut names: Vec<String> = std::fs::read_dir(&dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| is_item_file(n))
        .collect();
    names.sort();
    for name in names {
        let Some(content) = document::read_scanned(&dir.join(&name))? else {
            tracing::warn!(file = %name, "skipping backlog item that is not UTF-8");
            out.skipped.push(name);
            continue;
        };
        match frontmatter::extract(&content).and_then(|fm| BacklogItem::from_frontmatter(&fm, &name)) {
            Some(item) => out.items.push(item),
            None => {
                tracing::warn!(file = %name, "skipping malformed backlog item");
                out.skipped.push(name);
            }
        }
    }
    out.items.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(out)
}

fn next_id(root: &Path) -> Result<String> {
    let dir = paths::backlog_dir(root);
    let mut max = 0u32;
    if dir.is_dir() {
        for entry in std::fs::read_dir(&dir)? {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if let Some(n) = item_file_re()
                .captures(&name)
                .and_then(|c| c[1].parse::<u32>().ok())
            {
                max = max.max(n);
            }
        }
    }
    Ok(format!("B{:03}", max + 1))
}

fn normalize_id(id: &str) -> String {
    id.trim().to_ascii_uppercase()
}

fn item_path(root: &Path, id: &str) -> Result<PathBuf> {
    let id = normalize_id(id);
    let prefix = format!("{id}-");
    let dir = paths::backlog_dir(root);
    if dir.is_dir() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(&prefix) && is_item_file(&name) {
                return Ok(entry.path());
            }
        }
    }
    Err(PlanError::BacklogItemNotFound(id))
}

/// An item document opened for mutation.
struct ItemDoc {
    doc: Document,
    fm: Frontmatter,
}

impl ItemDoc {
    fn open(root: &Path, id: &str) -> Result<Self> {
        let doc = document::read_document(&item_path(root, id)?)?;
        let fm = doc
            .frontmatter()
            .ok_or_else(|| PlanError::MissingFrontmatter(doc.path.clone()))?;
        Ok(Self { doc, fm })
    }

    fn record(&mut self, now: &str, event: &str) {
        let mut log: Vec<Value> = self
            .fm
            .get("lifecycle_log")
            .and_then(Value::as_list)
            .map(<[Value]>::to_vec)
            .unwrap_or_default();
        log.push(Value::String(format!("{now} {event}")));
        self.fm.set_block_list("lifecycle_log", log);
        self.fm.set("updated", now);
    }

    fn save(mut self) -> Result<BacklogItem> {
        self.doc.write_fields(&self.fm)?;
        let file = self
            .doc
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        BacklogItem::from_frontmatter(&self.fm, &file)
            .ok_or_else(|| PlanError::MissingFrontmatter(self.doc.path.clone()))
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct NewItem {
    pub title: String,
    pub priority: Option<Priority>,
    pub group: Option<String>,
    pub tags: Vec<String>,
    pub description: Option<String>,
}

pub fn add(root: &Path, new: NewItem, now: &str) -> Result<BacklogItem> {
    let title = new.title.trim();
    if title.is_empty() {
        return Err(PlanError::InvalidValue("backlog item title is empty".to_string()));
    }
    let id = next_id(root)?;
    let file = format!("{id}-{}.md", paths::slugify(title));

    let mut fm = Frontmatter::new();
    fm.set("id", id.as_str());
    fm.set("title", title);
    fm.set("status", Status::Open.as_str());
    fm.set("priority", new.priority.unwrap_or(Priority::Medium).as_str());
    fm.set("group", new.group.map_or(Value::Null, Value::String));
    fm.set("tags", new.tags);
    fm.set("created", now);
    fm.set("updated", now);
    fm.set("promoted_to", Value::Null);
    fm.set("triage", Value::Null);
    fm.set_block_list("lifecycle_log", vec![Value::String(format!("{now} created"))]);

    let mut body = format!("# {title}\n");
    if let Some(desc) = new.description.filter(|d| !d.trim().is_empty()) {
        body.push('\n');
        body.push_str(desc.trim_end());
        body.push('\n');
    }
    write_document_atomic(
        &paths::backlog_dir(root).join(&file),
        &frontmatter::compose(&fm, &body),
    )?;
    tracing::debug!(%id, %file, "added backlog item");

    BacklogItem::from_frontmatter(&fm, &file)
        .ok_or_else(|| PlanError::MissingFrontmatter(paths::backlog_dir(root).join(&file)))
}

#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub group: Option<String>,
    pub tag: Option<String>,
}

impl ListFilter {
    fn matches(&self, item: &BacklogItem) -> bool {
        self.status.map_or(true, |s| item.status == s)
            && self.priority.map_or(true, |p| item.priority == p)
            && self
                .group
                .as_deref()
                .map_or(true, |g| item.group.as_deref() == Some(g))
            && self.tag.as_ref().map_or(true, |t| item.tags.contains(t))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BacklogList {
    pub count: usize,
    pub items: Vec<BacklogItem>,
    pub skipped: Vec<String>,
}

pub fn list(root: &Path, filter: &ListFilter) -> Result<BacklogList> {
    let scan = scan(root)?;
    let items: Vec<BacklogItem> = scan.items.into_iter().filter(|i| filter.matches(i)).collect();
    Ok(BacklogList {
        count: items.len(),
        items,
        skipped: scan.skipped,
    })
}

#[derive(Debug, Clone, Default)]
pub struct ItemUpdate {
    pub title: Option<String>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub tags: Option<Vec<String>>,
    /// Nested triage mapping, stored under `triage`.
    pub triage: Option<serde_json::Map<String, serde_json::Value>>,
}

pub fn update(root: &Path, id: &str, changes: ItemUpdate, now: &str) -> Result<BacklogItem> {
    let mut item = ItemDoc::open(root, id)?;
    let mut touched = Vec::new();

    if let Some(title) = changes.title {
        item.fm.set("title", title);
        touched.push("title");
    }
    if let Some(priority) = changes.priority {
        item.fm.set("priority", priority.as_str());
        touched.push("priority");
    }
    if let Some(tags) = changes.tags {
        item.fm.set("tags", tags);
        touched.push("tags");
    }
    if let Some(triage) = changes.triage {
        item.fm.set("triage", Value::from_json(&serde_json::Value::Object(triage)));
        touched.push("triage");
    }
    if !touched.is_empty() {
        item.record(now, &format!("updated {}", touched.join(", ")));
    }
    if let Some(status) = changes.status {
        if item.fm.get_str("status") != Some(status.as_str()) {
            item.fm.set("status", status.as_str());
            item.record(now, status.as_str());
        }
    }
    item.save()
}

#[derive(Debug, Clone, Serialize)]
pub struct PromotedItem {
    pub item: BacklogItem,
    pub phase: String,
    pub created_phase: bool,
}

/// Promote an item into a phase: an existing one, or a new phase appended
/// through the phase engine.
pub fn promote(root: &Path, id: &str, target: Option<PhaseId>, now: &str) -> Result<PromotedItem> {
    let mut item = ItemDoc::open(root, id)?;
    if let Some(existing) = item.fm.get("promoted_to").and_then(|v| v.string_items().pop()) {
        return Err(PlanError::InvalidValue(format!(
            "{} is already promoted to phase {existing}",
            normalize_id(id)
        )));
    }

    let (phase_id, created_phase) = match target {
        Some(p) => {
            if document::find_phase_dir(root, p)?.is_none() {
                return Err(PlanError::PhaseNotFound(p.padded()));
            }
            (p.padded(), false)
        }
        None => {
            let title = item.fm.get_str("title").unwrap_or("backlog item").to_string();
            (phase::add(root, &title)?.padded, true)
        }
    };

    item.fm.set("status", Status::Promoted.as_str());
    item.fm.set("promoted_to", phase_id.as_str());
    item.record(now, &format!("promoted to phase {phase_id}"));
    Ok(PromotedItem {
        item: item.save()?,
        phase: phase_id,
        created_phase,
    })
}

/// Assign (or with `None`, clear) the group of every listed item.
pub fn group(root: &Path, ids: &[String], name: Option<&str>, now: &str) -> Result<Vec<BacklogItem>> {
    // Resolve every id first so an unknown id changes nothing.
    for id in ids {
        item_path(root, id)?;
    }
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        let mut item = ItemDoc::open(root, id)?;
        let value = name.map_or(Value::Null, Value::from);
        if item.fm.get("group") != Some(&value) {
            item.fm.set("group", value);
            let event = match name {
                Some(n) => format!("grouped as {n}"),
                None => "ungrouped".to_string(),
            };
            item.record(now, &event);
        }
        out.push(item.save()?);
    }
    Ok(out)
}

#[derive(Debug, Clone, Serialize)]
pub struct BacklogStats {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    pub by_group: BTreeMap<String, usize>,
    pub skipped: usize,
}

pub fn stats(root: &Path) -> Result<BacklogStats> {
    let scan = scan(root)?;
    let mut by_status: BTreeMap<String, usize> =
        Status::ALL.iter().map(|s| (s.as_str().to_string(), 0)).collect();
    let mut by_priority: BTreeMap<String, usize> =
        Priority::ALL.iter().map(|p| (p.as_str().to_string(), 0)).collect();
    let mut by_group = BTreeMap::new();
    for item in &scan.items {
        *by_status.entry(item.status.to_string()).or_default() += 1;
        *by_priority.entry(item.priority.to_string()).or_default() += 1;
        let group = item.group.clone().unwrap_or_else(|| "ungrouped".to_string());
        *by_group.entry(group).or_default() += 1;
    }
    Ok(BacklogStats {
        total: scan.items.len(),
        by_status,
        by_priority,
        by_group,
        skipped: scan.skipped.len(),
    })
}

// ---------------------------------------------------------------------------
// INDEX.md
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    pub path: String,
    pub item_count: usize,
    pub skipped: Vec<String>,
}

fn table_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

pub fn render_index(items: &[BacklogItem], date: &str) -> String {
    let mut out = format!(
        "# Backlog Index\n\n_Generated {date}. {} item(s)._\n",
        items.len()
    );
    for status in Status::ALL {
        let mut group: Vec<&BacklogItem> = items.iter().filter(|i| i.status == status).collect();
        if group.is_empty() {
            continue;
        }
        group.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        let heading = match status {
            Status::Open => "Open",
            Status::Triaged => "Triaged",
            Status::Promoted => "Promoted",
            Status::Dropped => "Dropped",
        };
        out.push_str(&format!("\n## {heading} ({})\n\n", group.len()));
        out.push_str("| ID | Title | Priority | Group | Tags |\n");
        out.push_str("|----|-------|----------|-------|------|\n");
        for item in group {
            out.push_str(&format!(
                "| [{id}]({file}) | {title} | {priority} | {group} | {tags} |\n",
                id = item.id,
                file = item.file,
                title = table_cell(&item.title),
                priority = item.priority,
                group = table_cell(item.group.as_deref().unwrap_or("")),
                tags = table_cell(&item.tags.join(", ")),
            ));
        }
    }
    out
}

/// Regenerate `.planning/backlog/INDEX.md` from the item documents.
pub fn index(root: &Path, date: &str) -> Result<IndexReport> {
    let scan = scan(root)?;
    let path = paths::backlog_index_path(root);
    write_document_atomic(&path, &render_index(&scan.items, date))?;
    Ok(IndexReport {
        path: path.display().to_string(),
        item_count: scan.items.len(),
        skipped: scan.skipped,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
