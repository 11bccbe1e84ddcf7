//! Phase numbering engine.
//!
//! Phases are directories under `.planning/phases/` named `{id}-{slug}`.
//! Adding, inserting and removing phases keeps three things consistent: the
//! directory names, the `{id}-` prefixes of the files inside them, and the
//! prose in `ROADMAP.md` / `STATE.md`.
//!
//! Removal is split into a pure planning step ([`plan_removal`]) that turns
//! the on-disk layout into a [`RenamePlan`], and an execution step that
//! applies the plan in an order where no target is a still-pending source.

use crate::document::{self, PhaseDir, PhaseFiles};
use crate::error::{PlanError, Result};
use crate::paths;
use crate::phase_id::PhaseId;
use crate::roadmap::Roadmap;
use crate::state::{self, ProjectState};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

// ---------------------------------------------------------------------------
// PhaseState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseState {
    /// Directory exists, no plans yet.
    Planned,
    /// At least one plan is missing its summary.
    InProgress,
    /// Every plan has a matching summary.
    Complete,
    /// Named in the roadmap but absent on disk.
    NoDirectory,
}

impl PhaseState {
    pub fn from_files(files: &PhaseFiles) -> Self {
        if files.plan_count() == 0 {
            PhaseState::Planned
        } else if files.executed_count() == files.plan_count() {
            PhaseState::Complete
        } else {
            PhaseState::InProgress
        }
    }
}

fn load_roadmap(root: &Path) -> Result<Roadmap> {
    Roadmap::load(root)?.ok_or(PlanError::NotInitialized)
}

fn create_phase_dir(root: &Path, id: PhaseId, slug: &str) -> Result<String> {
    let name = format!("{}-{slug}", id.padded());
    let dir = paths::phases_dir(root).join(&name);
    crate::io::ensure_dir(&dir)?;
    crate::io::write_if_missing(&dir.join(".gitkeep"), b"")?;
    Ok(name)
}

fn bump_total_phases(root: &Path, delta: i64) -> Result<bool> {
    match ProjectState::load(root)? {
        Some(mut st) => {
            st.adjust_total_phases(delta);
            st.save()
        }
        None => Ok(false),
    }
}

// ---------------------------------------------------------------------------
// add / insert / next-decimal
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct AddedPhase {
    pub phase_number: String,
    pub padded: String,
    pub name: String,
    pub slug: String,
    pub directory: String,
    pub depends_on: Option<String>,
}

/// Append a new integer phase after the highest existing one.
pub fn add(root: &Path, title: &str) -> Result<AddedPhase> {
    let mut roadmap = load_roadmap(root)?;
    let max = document::list_phase_dirs(root)?
        .iter()
        .map(|d| d.id.major())
        .chain(roadmap.phase_ids().iter().map(|id| id.major()))
        .max();
    let id = PhaseId::integer(max.map_or(1, |m| m + 1));
    let previous = max.map(PhaseId::integer);
    let slug = paths::slugify(title);

    let directory = create_phase_dir(root, id, &slug)?;
    roadmap.append_phase(id, title, previous);
    roadmap.save(root)?;
    bump_total_phases(root, 1)?;
    tracing::debug!(phase = %id, %directory, "added phase");

    Ok(AddedPhase {
        phase_number: id.label(),
        padded: id.padded(),
        name: title.to_string(),
        slug,
        directory,
        depends_on: previous.map(|p| p.label()),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct NextDecimal {
    pub base: String,
    pub next: String,
    pub existing: Vec<String>,
}

/// Next decimal id under `base`: one past the highest existing suffix.
/// Gaps left by earlier removals are never refilled.
pub fn next_decimal(root: &Path, base: PhaseId) -> Result<NextDecimal> {
    let base = base.parent();
    let mut existing: BTreeSet<PhaseId> = document::list_phase_dirs(root)?
        .iter()
        .map(|d| d.id)
        .collect();
    if let Some(roadmap) = Roadmap::load(root)? {
        existing.extend(roadmap.phase_ids());
    }
    let children: Vec<PhaseId> = existing
        .into_iter()
        .filter(|id| id.major() == base.major() && !id.is_integer())
        .collect();
    let max = children.iter().filter_map(|id| id.minor()).max().unwrap_or(0);
    Ok(NextDecimal {
        base: base.padded(),
        next: PhaseId::decimal(base.major(), max + 1).padded(),
        existing: children.iter().map(|id| id.padded()).collect(),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct InsertedPhase {
    pub phase_number: String,
    pub padded: String,
    pub after_phase: String,
    pub name: String,
    pub slug: String,
    pub directory: String,
}

/// Insert a decimal phase after integer phase `after`.
pub fn insert(root: &Path, after: PhaseId, title: &str) -> Result<InsertedPhase> {
    if !after.is_integer() {
        return Err(PlanError::InvalidValue(format!(
            "phases can only be inserted after an integer phase, got {}",
            after.padded()
        )));
    }
    if document::find_phase_dir(root, after)?.is_none() {
        return Err(PlanError::PhaseNotFound(after.padded()));
    }
    let mut roadmap = load_roadmap(root)?;
    let next = next_decimal(root, after)?;
    let id: PhaseId = next.next.parse()?;
    let slug = paths::slugify(title);

    let directory = create_phase_dir(root, id, &slug)?;
    roadmap.insert_phase_after(after, id, title);
    roadmap.save(root)?;
    bump_total_phases(root, 1)?;
    tracing::debug!(phase = %id, %directory, "inserted phase");

    Ok(InsertedPhase {
        phase_number: id.label(),
        padded: id.padded(),
        after_phase: after.label(),
        name: title.to_string(),
        slug,
        directory,
    })
}

// ---------------------------------------------------------------------------
// Rename planning
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRename {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseRename {
    pub from: PhaseId,
    pub to: PhaseId,
    pub from_dir: String,
    pub to_dir: String,
    /// Renames of files inside the directory, applied before the directory
    /// itself moves.
    pub files: Vec<FileRename>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenamePlan {
    pub removed: PhaseId,
    pub renames: Vec<PhaseRename>,
}

impl RenamePlan {
    pub fn mapping(&self) -> BTreeMap<PhaseId, PhaseId> {
        self.renames.iter().map(|r| (r.from, r.to)).collect()
    }

    /// Indices of `renames` in an order where every target id is free when
    /// its rename runs. `occupied` holds the phase ids on disk before
    /// execution (excluding the removed phase).
    pub fn execution_order(&self, occupied: &BTreeSet<PhaseId>) -> Result<Vec<usize>> {
        let mut present = occupied.clone();
        let mut pending: Vec<usize> = (0..self.renames.len()).collect();
        let mut order = Vec::with_capacity(pending.len());
        while !pending.is_empty() {
            let ready = pending.iter().position(|&i| !present.contains(&self.renames[i].to));
            let Some(pos) = ready else {
                // Every remaining target is held, either by a phase that is
                // not moving or by a cycle of pending renames.
                let stuck = &self.renames[pending[0]];
                return Err(PlanError::RenameCollision(stuck.to_dir.clone().into()));
            };
            let idx = pending.remove(pos);
            let r = &self.renames[idx];
            present.remove(&r.from);
            present.insert(r.to);
            order.push(idx);
        }
        Ok(order)
    }
}

/// Shifted id of `id` after removing `removed`, or `None` when unaffected.
///
/// Removing an integer phase shifts every phase with a greater integer part
/// down by one (decimal children move with their parent). Removing a decimal
/// phase shifts only its later siblings.
pub fn shifted_id(removed: PhaseId, id: PhaseId) -> Option<PhaseId> {
    match removed.minor() {
        None if id.major() > removed.major() => Some(match id.minor() {
            Some(minor) => PhaseId::decimal(id.major() - 1, minor),
            None => PhaseId::integer(id.major() - 1),
        }),
        Some(gone) if id.major() == removed.major() => match id.minor() {
            Some(minor) if minor > gone => Some(PhaseId::decimal(id.major(), minor - 1)),
            _ => None,
        },
        _ => None,
    }
}

/// Compute every rename needed after removing `removed`, without touching
/// the filesystem. `phases` are the remaining phases with their files.
pub fn plan_removal(removed: PhaseId, phases: &[(PhaseDir, PhaseFiles)]) -> Result<RenamePlan> {
    let mut renames = Vec::new();
    for (dir, files) in phases {
        let Some(to) = shifted_id(removed, dir.id) else {
            continue;
        };
        files.ensure_contiguous(dir.id)?;
        let old_prefix = format!("{}-", dir.id.padded());
        let new_prefix = format!("{}-", to.padded());
        let file_renames = files
            .all
            .iter()
            .filter_map(|name| {
                name.strip_prefix(&old_prefix).map(|rest| FileRename {
                    from: name.clone(),
                    to: format!("{new_prefix}{rest}"),
                })
            })
            .collect();
        renames.push(PhaseRename {
            from: dir.id,
            to,
            from_dir: dir.name.clone(),
            to_dir: format!("{}-{}", to.padded(), dir.slug),
            files: file_renames,
        });
    }
    renames.sort_by_key(|r| r.from);
    Ok(RenamePlan { removed, renames })
}

fn execute_rename(phases_dir: &Path, rename: &PhaseRename) -> Result<()> {
    let from_dir = phases_dir.join(&rename.from_dir);
    for f in &rename.files {
        let target = from_dir.join(&f.to);
        if target.exists() {
            return Err(PlanError::RenameCollision(target));
        }
        std::fs::rename(from_dir.join(&f.from), &target)?;
        tracing::debug!(from = %f.from, to = %f.to, "renamed phase file");
    }
    let to_dir = phases_dir.join(&rename.to_dir);
    if to_dir.exists() {
        return Err(PlanError::RenameCollision(to_dir));
    }
    std::fs::rename(&from_dir, &to_dir)?;
    tracing::debug!(from = %rename.from_dir, to = %rename.to_dir, "renamed phase directory");
    Ok(())
}

// ---------------------------------------------------------------------------
// remove
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveOptions {
    pub force: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemovedPhase {
    pub removed: String,
    pub directory: Option<String>,
    pub forced: bool,
    pub dry_run: bool,
    pub renamed_directories: usize,
    pub renamed_files: usize,
    pub renames: Vec<PhaseRename>,
    pub roadmap_updated: bool,
    pub state_updated: bool,
}

pub fn remove(root: &Path, id: PhaseId, opts: RemoveOptions) -> Result<RemovedPhase> {
    let dirs = document::list_phase_dirs(root)?;
    let mut roadmap = Roadmap::load(root)?;
    let target = dirs.iter().find(|d| d.id == id).cloned();
    let in_roadmap = roadmap
        .as_ref()
        .is_some_and(|r| r.phase_ids().contains(&id));
    if target.is_none() && !in_roadmap {
        return Err(PlanError::PhaseNotFound(id.padded()));
    }

    if let Some(dir) = &target {
        let summaries = dir.files()?.any_summary_count();
        if summaries > 0 && !opts.force {
            return Err(PlanError::HasExecutedWork {
                phase: id.padded(),
                summaries,
            });
        }
    }

    let mut remaining = Vec::new();
    for dir in dirs.into_iter().filter(|d| d.id != id) {
        let files = dir.files()?;
        remaining.push((dir, files));
    }
    let plan = plan_removal(id, &remaining)?;
    let occupied: BTreeSet<PhaseId> = remaining.iter().map(|(d, _)| d.id).collect();
    let order = plan.execution_order(&occupied)?;

    let mut result = RemovedPhase {
        removed: id.padded(),
        directory: target.as_ref().map(|d| d.name.clone()),
        forced: opts.force,
        dry_run: opts.dry_run,
        renamed_directories: plan.renames.len(),
        renamed_files: plan.renames.iter().map(|r| r.files.len()).sum(),
        renames: plan.renames.clone(),
        roadmap_updated: false,
        state_updated: false,
    };
    if opts.dry_run {
        return Ok(result);
    }

    if let Some(dir) = &target {
        std::fs::remove_dir_all(&dir.path)?;
        tracing::debug!(directory = %dir.name, "deleted phase directory");
    }
    let phases_dir = paths::phases_dir(root);
    for idx in order {
        execute_rename(&phases_dir, &plan.renames[idx])?;
    }

    let mapping = plan.mapping();
    if let Some(r) = roadmap.as_mut() {
        r.remove_phase(id);
        r.renumber(&mapping);
        r.save(root)?;
        result.roadmap_updated = true;
    }

    if let Some(mut st) = ProjectState::load(root)? {
        st.adjust_total_phases(-1);
        let current = st
            .field(state::CURRENT_PHASE)
            .and_then(|v| v.parse::<PhaseId>().ok());
        if let Some(new) = current.and_then(|c| mapping.get(&c)) {
            st.set_field(state::CURRENT_PHASE, &new.padded());
        }
        result.state_updated = st.save()?;
    }
    Ok(result)
}

// ---------------------------------------------------------------------------
// complete
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CompletedPhase {
    pub completed_phase: String,
    pub phase_name: String,
    pub plans_executed: String,
    pub all_plans_executed: bool,
    pub next_phase: Option<String>,
    pub next_phase_name: Option<String>,
    pub is_last_phase: bool,
    pub date: String,
    pub roadmap_updated: bool,
    pub state_updated: bool,
}

fn display_name(roadmap: Option<&Roadmap>, dir: &PhaseDir) -> String {
    roadmap
        .and_then(|r| r.section(dir.id))
        .map(|s| s.name)
        .unwrap_or_else(|| dir.slug.replace('-', " "))
}

/// Mark `id` complete and advance `STATE.md` to the next phase on disk.
///
/// Unexecuted plans do not block completion; they are reported through
/// `plans_executed` / `all_plans_executed`.
pub fn complete(root: &Path, id: PhaseId, date: &str) -> Result<CompletedPhase> {
    let dirs = document::list_phase_dirs(root)?;
    let dir = dirs
        .iter()
        .find(|d| d.id == id)
        .ok_or_else(|| PlanError::PhaseNotFound(id.padded()))?;
    let files = dir.files()?;
    let executed = files.executed_count();
    let all_plans_executed = files.plan_count() > 0 && executed == files.plan_count();
    if !all_plans_executed {
        tracing::warn!(
            phase = %id,
            executed,
            plans = files.plan_count(),
            "completing phase with unexecuted plans"
        );
    }

    let mut roadmap = Roadmap::load(root)?;
    let mut roadmap_updated = false;
    if let Some(r) = roadmap.as_mut() {
        if r.mark_complete(id, date) {
            r.save(root)?;
            roadmap_updated = true;
        }
    }

    let next = dirs.iter().find(|d| d.id > id);
    let next_name = next.map(|d| display_name(roadmap.as_ref(), d));

    let mut state_updated = false;
    if let Some(mut st) = ProjectState::load(root)? {
        match (next, &next_name) {
            (Some(n), Some(name)) => {
                st.set_field(state::CURRENT_PHASE, &n.id.padded());
                st.set_field(state::CURRENT_PHASE_NAME, name);
                st.set_field(state::STATUS, state::STATUS_READY_TO_PLAN);
            }
            _ => {
                st.set_field(state::STATUS, state::STATUS_MILESTONE_COMPLETE);
            }
        }
        st.set_field(state::CURRENT_PLAN, state::PLAN_NOT_STARTED);
        st.set_field(state::LAST_ACTIVITY, date);
        state_updated = st.save()?;
    }

    Ok(CompletedPhase {
        completed_phase: id.padded(),
        phase_name: display_name(roadmap.as_ref(), dir),
        plans_executed: format!("{executed}/{}", files.plan_count()),
        all_plans_executed,
        next_phase: next.map(|d| d.id.padded()),
        next_phase_name: next_name,
        is_last_phase: next.is_none(),
        date: date.to_string(),
        roadmap_updated,
        state_updated,
    })
}

// ---------------------------------------------------------------------------
// list / status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct PhaseSummary {
    pub id: PhaseId,
    pub directory: String,
    pub slug: String,
    pub plan_count: usize,
    pub summary_count: usize,
    pub state: PhaseState,
}

pub fn list(root: &Path) -> Result<Vec<PhaseSummary>> {
    document::list_phase_dirs(root)?
        .into_iter()
        .map(|d| {
            let files = d.files()?;
            Ok(PhaseSummary {
                id: d.id,
                plan_count: files.plan_count(),
                summary_count: files.summary_count(),
                state: PhaseState::from_files(&files),
                directory: d.name,
                slug: d.slug,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct PhaseStatus {
    pub phase: PhaseId,
    pub state: PhaseState,
    pub directory: Option<String>,
    pub in_roadmap: bool,
    pub plan_count: usize,
    pub summary_count: usize,
    pub plans_missing_summary: Vec<String>,
}

pub fn status(root: &Path, id: PhaseId) -> Result<PhaseStatus> {
    let in_roadmap = Roadmap::load(root)?.is_some_and(|r| r.phase_ids().contains(&id));
    let Some(dir) = document::find_phase_dir(root, id)? else {
        if !in_roadmap {
            return Err(PlanError::PhaseNotFound(id.padded()));
        }
        return Ok(PhaseStatus {
            phase: id,
            state: PhaseState::NoDirectory,
            directory: None,
            in_roadmap,
            plan_count: 0,
            summary_count: 0,
            plans_missing_summary: Vec::new(),
        });
    };
    let files = dir.files()?;
    Ok(PhaseStatus {
        phase: id,
        state: PhaseState::from_files(&files),
        directory: Some(dir.name.clone()),
        in_roadmap,
        plan_count: files.plan_count(),
        summary_count: files.summary_count(),
        plans_missing_summary: files
            .plans_missing_summary()
            .into_iter()
            .map(|p| p.file_name.clone())
            .collect(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn id(s: &str) -> PhaseId {
        s.parse().unwrap()
    }

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(paths::phases_dir(dir.path())).unwrap();
        std::fs::write(
            paths::roadmap_path(dir.path()),
            crate::roadmap::template("demo"),
        )
        .unwrap();
        std::fs::write(
            paths::state_path(dir.path()),
            state::template("demo", "2026-10-01"),
        )
        .unwrap();
        dir
    }

    fn touch(dir: &Path, names: &[&str]) {
        for n in names {
            std::fs::write(dir.join(n), format!("---\nfile: {n}\n---\n")).unwrap();
        }
    }

    fn phase_path(root: &Path, name: &str) -> PathBuf {
        paths::phases_dir(root).join(name)
    }

    fn disk_names(root: &Path) -> Vec<String> {
        document::list_phase_dirs(root)
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect()
    }

    fn state_field(root: &Path, field: &str) -> Option<String> {
        ProjectState::load(root).unwrap().unwrap().field(field)
    }

    #[test]
    fn add_numbers_sequentially() {
        let dir = project();
        let first = add(dir.path(), "Foundation").unwrap();
        assert_eq!(first.padded, "01");
        assert_eq!(first.depends_on, None);
        let second = add(dir.path(), "API Layer").unwrap();
        assert_eq!(second.padded, "02");
        assert_eq!(second.directory, "02-api-layer");
        assert_eq!(second.depends_on.as_deref(), Some("1"));

        assert!(phase_path(dir.path(), "02-api-layer/.gitkeep").exists());
        let roadmap = Roadmap::load(dir.path()).unwrap().unwrap();
        let s = roadmap.section(id("2")).unwrap();
        assert_eq!(s.depends_on.as_deref(), Some("Phase 1"));
        assert_eq!(
            state_field(dir.path(), state::TOTAL_PHASES).as_deref(),
            Some("2")
        );
    }

    #[test]
    fn add_without_roadmap_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            add(dir.path(), "x").unwrap_err(),
            PlanError::NotInitialized
        ));
    }

    #[test]
    fn next_decimal_never_fills_gaps() {
        let dir = project();
        std::fs::create_dir_all(phase_path(dir.path(), "06-core")).unwrap();
        assert_eq!(next_decimal(dir.path(), id("06")).unwrap().next, "06.1");

        std::fs::create_dir_all(phase_path(dir.path(), "06.1-a")).unwrap();
        std::fs::create_dir_all(phase_path(dir.path(), "06.3-c")).unwrap();
        let next = next_decimal(dir.path(), id("6")).unwrap();
        assert_eq!(next.next, "06.4");
        assert_eq!(next.existing, ["06.1", "06.3"]);
    }

    #[test]
    fn insert_creates_decimal_phase() {
        let dir = project();
        add(dir.path(), "Foundation").unwrap();
        add(dir.path(), "API").unwrap();
        let inserted = insert(dir.path(), id("1"), "Hotfix").unwrap();
        assert_eq!(inserted.padded, "01.1");
        assert_eq!(inserted.directory, "01.1-hotfix");
        let again = insert(dir.path(), id("1"), "Patch").unwrap();
        assert_eq!(again.padded, "01.2");

        assert_eq!(disk_names(dir.path()), ["01-foundation", "01.1-hotfix", "01.2-patch", "02-api"]);
        let roadmap = Roadmap::load(dir.path()).unwrap().unwrap();
        let order: Vec<String> = roadmap.sections().iter().map(|s| s.id.padded()).collect();
        assert_eq!(order, ["01", "01.1", "01.2", "02"]);
        assert!(roadmap.content().contains("### Phase 1.1: Hotfix (INSERTED)"));
    }

    #[test]
    fn insert_after_missing_phase_fails() {
        let dir = project();
        let err = insert(dir.path(), id("4"), "Nope").unwrap_err();
        assert!(matches!(err, PlanError::PhaseNotFound(p) if p == "04"));
    }

    #[test]
    fn plan_removal_is_pure_and_ordered() {
        let dir = project();
        let root = dir.path();
        for name in ["01-a", "03-c", "03.1-c-fix", "04-d"] {
            std::fs::create_dir_all(phase_path(root, name)).unwrap();
        }
        touch(&phase_path(root, "03-c"), &["03-01-PLAN.md", "03-01-SUMMARY.md", "03-CONTEXT.md", "notes.md"]);
        touch(&phase_path(root, "04-d"), &["04-01-PLAN.md", "04-02-PLAN.md"]);

        let phases: Vec<(PhaseDir, PhaseFiles)> = document::list_phase_dirs(root)
            .unwrap()
            .into_iter()
            .map(|d| {
                let f = d.files().unwrap();
                (d, f)
            })
            .collect();
        let plan = plan_removal(id("2"), &phases).unwrap();

        let moves: Vec<(String, String)> = plan
            .renames
            .iter()
            .map(|r| (r.from_dir.clone(), r.to_dir.clone()))
            .collect();
        assert_eq!(
            moves,
            [
                ("03-c".to_string(), "02-c".to_string()),
                ("03.1-c-fix".to_string(), "02.1-c-fix".to_string()),
                ("04-d".to_string(), "03-d".to_string()),
            ]
        );
        let c_files: Vec<(&str, &str)> = plan.renames[0]
            .files
            .iter()
            .map(|f| (f.from.as_str(), f.to.as_str()))
            .collect();
        assert_eq!(
            c_files,
            [
                ("03-01-PLAN.md", "02-01-PLAN.md"),
                ("03-01-SUMMARY.md", "02-01-SUMMARY.md"),
                ("03-CONTEXT.md", "02-CONTEXT.md"),
            ]
        );
        // Planning never touches disk.
        assert!(phase_path(root, "03-c").exists());
        assert!(!phase_path(root, "02-c").exists());
    }

    #[test]
    fn execution_order_waits_for_pending_sources() {
        let plan = RenamePlan {
            removed: id("1"),
            renames: vec![
                PhaseRename {
                    from: id("3"),
                    to: id("2"),
                    from_dir: "03-x".into(),
                    to_dir: "02-x".into(),
                    files: vec![],
                },
                PhaseRename {
                    from: id("2"),
                    to: id("1"),
                    from_dir: "02-x".into(),
                    to_dir: "01-x".into(),
                    files: vec![],
                },
            ],
        };
        let occupied = BTreeSet::from([id("2"), id("3")]);
        assert_eq!(plan.execution_order(&occupied).unwrap(), vec![1, 0]);

        let blocked = BTreeSet::from([id("1"), id("2"), id("3")]);
        assert!(matches!(
            plan.execution_order(&blocked).unwrap_err(),
            PlanError::RenameCollision(_)
        ));
    }

    #[test]
    fn remove_integer_cascades_renumbering() {
        let dir = project();
        let root = dir.path();
        add(root, "Foundation").unwrap();
        add(root, "API").unwrap();
        add(root, "UI").unwrap();
        touch(&phase_path(root, "03-ui"), &["03-01-PLAN.md", "03-02-PLAN.md", "03-CONTEXT.md"]);

        let result = remove(root, id("2"), RemoveOptions::default()).unwrap();
        assert_eq!(result.directory.as_deref(), Some("02-api"));
        assert_eq!(result.renamed_directories, 1);

        assert_eq!(disk_names(root), ["01-foundation", "02-ui"]);
        let files = scan(&phase_path(root, "02-ui"));
        assert_eq!(files, [".gitkeep", "02-01-PLAN.md", "02-02-PLAN.md", "02-CONTEXT.md"]);

        let roadmap = Roadmap::load(root).unwrap().unwrap();
        let s = roadmap.section(id("2")).unwrap();
        assert_eq!(s.name, "UI");
        assert!(roadmap.section(id("3")).is_none());
        assert!(!roadmap.content().contains("API"));
        assert_eq!(state_field(root, state::TOTAL_PHASES).as_deref(), Some("2"));
    }

    fn scan(dir: &Path) -> Vec<String> {
        document::scan_phase_files(dir).unwrap().all
    }

    #[test]
    fn remove_integer_with_orphaned_decimal_collides() {
        let dir = project();
        let root = dir.path();
        for name in ["01-a", "02-b", "02.1-b-fix", "03-c", "03.1-c-fix"] {
            std::fs::create_dir_all(phase_path(root, name)).unwrap();
        }
        let err = remove(root, id("2"), RemoveOptions::default()).unwrap_err();
        assert!(matches!(err, PlanError::RenameCollision(_)));
        assert_eq!(disk_names(root), ["01-a", "02-b", "02.1-b-fix", "03-c", "03.1-c-fix"]);
    }

    #[test]
    fn remove_decimal_shifts_later_siblings_only() {
        let dir = project();
        let root = dir.path();
        for name in ["02-api", "02.1-a", "02.2-b", "02.3-c", "03-ui"] {
            std::fs::create_dir_all(phase_path(root, name)).unwrap();
        }
        touch(&phase_path(root, "02.3-c"), &["02.3-01-PLAN.md"]);
        remove(root, id("2.1"), RemoveOptions::default()).unwrap();
        assert_eq!(disk_names(root), ["02-api", "02.1-b", "02.2-c", "03-ui"]);
        assert_eq!(scan(&phase_path(root, "02.2-c")), ["02.2-01-PLAN.md"]);
    }

    #[test]
    fn remove_with_summaries_requires_force() {
        let dir = project();
        let root = dir.path();
        add(root, "Foundation").unwrap();
        touch(&phase_path(root, "01-foundation"), &["01-01-PLAN.md", "01-01-SUMMARY.md"]);

        let err = remove(root, id("1"), RemoveOptions::default()).unwrap_err();
        assert!(matches!(err, PlanError::HasExecutedWork { summaries: 1, .. }));
        assert!(phase_path(root, "01-foundation").exists());

        remove(root, id("1"), RemoveOptions { force: true, dry_run: false }).unwrap();
        assert!(!phase_path(root, "01-foundation").exists());
    }

    #[test]
    fn phase_level_summary_also_blocks_remove() {
        let dir = project();
        let root = dir.path();
        add(root, "A").unwrap();
        touch(&phase_path(root, "01-a"), &["01-SUMMARY.md"]);

        let err = remove(root, id("1"), RemoveOptions::default()).unwrap_err();
        assert!(matches!(err, PlanError::HasExecutedWork { summaries: 1, .. }));
        assert!(phase_path(root, "01-a").exists());
    }

    #[test]
    fn remove_rejects_gapped_plans_before_touching_disk() {
        let dir = project();
        let root = dir.path();
        add(root, "A").unwrap();
        add(root, "B").unwrap();
        add(root, "C").unwrap();
        touch(&phase_path(root, "03-c"), &["03-01-PLAN.md", "03-03-PLAN.md"]);

        let err = remove(root, id("2"), RemoveOptions::default()).unwrap_err();
        assert!(matches!(err, PlanError::NonContiguousPlans { .. }));
        assert_eq!(disk_names(root), ["01-a", "02-b", "03-c"]);
    }

    #[test]
    fn remove_dry_run_changes_nothing() {
        let dir = project();
        let root = dir.path();
        add(root, "A").unwrap();
        add(root, "B").unwrap();
        let before = std::fs::read_to_string(paths::roadmap_path(root)).unwrap();
        let result = remove(root, id("1"), RemoveOptions { force: false, dry_run: true }).unwrap();
        assert!(result.dry_run);
        assert_eq!(result.renames[0].to_dir, "01-b");
        assert_eq!(disk_names(root), ["01-a", "02-b"]);
        assert_eq!(std::fs::read_to_string(paths::roadmap_path(root)).unwrap(), before);
    }

    #[test]
    fn remove_unknown_phase_is_not_found() {
        let dir = project();
        assert!(matches!(
            remove(dir.path(), id("9"), RemoveOptions::default()).unwrap_err(),
            PlanError::PhaseNotFound(_)
        ));
    }

    #[test]
    fn complete_advances_state() {
        let dir = project();
        let root = dir.path();
        add(root, "Foundation").unwrap();
        add(root, "API").unwrap();
        touch(&phase_path(root, "01-foundation"), &["01-01-PLAN.md", "01-01-SUMMARY.md"]);

        let done = complete(root, id("1"), "2026-10-18").unwrap();
        assert_eq!(done.plans_executed, "1/1");
        assert!(done.all_plans_executed);
        assert_eq!(done.next_phase.as_deref(), Some("02"));
        assert_eq!(done.next_phase_name.as_deref(), Some("API"));
        assert!(!done.is_last_phase);
        assert!(done.roadmap_updated);

        let roadmap = Roadmap::load(root).unwrap().unwrap();
        assert!(roadmap
            .content()
            .contains("- [x] **Phase 1: Foundation** (completed 2026-10-18)"));
        assert_eq!(state_field(root, state::CURRENT_PHASE).as_deref(), Some("02"));
        assert_eq!(state_field(root, state::CURRENT_PHASE_NAME).as_deref(), Some("API"));
        assert_eq!(
            state_field(root, state::CURRENT_PLAN).as_deref(),
            Some(state::PLAN_NOT_STARTED)
        );
    }

    #[test]
    fn complete_last_phase_marks_milestone() {
        let dir = project();
        let root = dir.path();
        add(root, "Only").unwrap();
        touch(&phase_path(root, "01-only"), &["01-01-PLAN.md", "01-02-PLAN.md", "01-01-SUMMARY.md"]);
        let done = complete(root, id("1"), "2026-10-18").unwrap();
        assert_eq!(done.plans_executed, "1/2");
        assert!(!done.all_plans_executed);
        assert!(done.is_last_phase);
        assert_eq!(
            state_field(root, state::STATUS).as_deref(),
            Some(state::STATUS_MILESTONE_COMPLETE)
        );
    }

    #[test]
    fn status_covers_every_state() {
        let dir = project();
        let root = dir.path();
        add(root, "A").unwrap();
        add(root, "B").unwrap();
        add(root, "C").unwrap();
        touch(&phase_path(root, "02-b"), &["02-01-PLAN.md"]);
        touch(&phase_path(root, "03-c"), &["03-01-PLAN.md", "03-01-SUMMARY.md"]);
        std::fs::remove_dir_all(phase_path(root, "01-a")).unwrap();

        assert_eq!(status(root, id("1")).unwrap().state, PhaseState::NoDirectory);
        let b = status(root, id("2")).unwrap();
        assert_eq!(b.state, PhaseState::InProgress);
        assert_eq!(b.plans_missing_summary, ["02-01-PLAN.md"]);
        assert_eq!(status(root, id("3")).unwrap().state, PhaseState::Complete);
        add(root, "D").unwrap();
        assert_eq!(status(root, id("4")).unwrap().state, PhaseState::Planned);
        assert!(status(root, id("9")).is_err());
    }
}
