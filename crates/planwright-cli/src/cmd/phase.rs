use crate::output::{print_found, print_json, print_not_found};
use anyhow::Context;
use clap::Subcommand;
use planwright_core::{
    clock,
    phase::{self, RemoveOptions},
    PhaseId, PlanError,
};
use std::path::Path;

#[derive(Subcommand)]
pub enum PhaseSubcommand {
    /// Append a new integer phase after the highest existing one
    Add {
        /// Phase title
        title: String,
    },
    /// Insert a decimal phase after an integer phase (e.g. 06 -> 06.1)
    Insert {
        /// Integer phase to insert after
        after: PhaseId,
        /// Phase title
        title: String,
    },
    /// Remove a phase and renumber the phases after it
    Remove {
        id: PhaseId,
        /// Remove even if some plans already have summaries
        #[arg(long)]
        force: bool,
        /// Print the rename plan without touching disk
        #[arg(long)]
        dry_run: bool,
    },
    /// Mark a phase complete and advance STATE.md
    Complete {
        id: PhaseId,
        /// Completion date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Print the next free decimal id under a base phase
    NextDecimal { base: PhaseId },
    /// List on-disk phases with plan and summary counts
    List,
    /// Show the state of one phase
    Status { id: PhaseId },
}

pub fn run(root: &Path, subcmd: PhaseSubcommand) -> anyhow::Result<()> {
    match subcmd {
        PhaseSubcommand::Add { title } => {
            let added = phase::add(root, &title)
                .with_context(|| format!("failed to add phase '{title}'"))?;
            print_json(&added)
        }
        PhaseSubcommand::Insert { after, title } => {
            let inserted = phase::insert(root, after, &title)
                .with_context(|| format!("failed to insert phase after {after}"))?;
            print_json(&inserted)
        }
        PhaseSubcommand::Remove { id, force, dry_run } => {
            let removed = phase::remove(root, id, RemoveOptions { force, dry_run })
                .with_context(|| format!("failed to remove phase {id}"))?;
            print_json(&removed)
        }
        PhaseSubcommand::Complete { id, date } => {
            let date = date.unwrap_or_else(clock::today);
            let completed = phase::complete(root, id, &date)
                .with_context(|| format!("failed to complete phase {id}"))?;
            print_json(&completed)
        }
        PhaseSubcommand::NextDecimal { base } => {
            let next = phase::next_decimal(root, base).context("failed to scan phases")?;
            print_json(&next)
        }
        PhaseSubcommand::List => {
            let phases = phase::list(root).context("failed to list phases")?;
            print_json(&serde_json::json!({
                "count": phases.len(),
                "phases": phases,
            }))
        }
        PhaseSubcommand::Status { id } => match phase::status(root, id) {
            Ok(status) => print_found(status),
            Err(e @ PlanError::PhaseNotFound(_)) => print_not_found(e),
            Err(e) => Err(e).with_context(|| format!("failed to read phase {id}")),
        },
    }
}
