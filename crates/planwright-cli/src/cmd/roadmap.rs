use crate::output::{print_found, print_json, print_not_found};
use anyhow::Context;
use clap::Subcommand;
use planwright_core::{roadmap, PhaseId, PlanError};
use std::path::Path;

#[derive(Subcommand)]
pub enum RoadmapSubcommand {
    /// Extract one phase section from ROADMAP.md
    GetPhase { id: PhaseId },
    /// Per-phase roadmap and disk status with overall progress
    Analyze,
}

pub fn run(root: &Path, subcmd: RoadmapSubcommand) -> anyhow::Result<()> {
    match subcmd {
        RoadmapSubcommand::GetPhase { id } => match roadmap::get_phase(root, id) {
            Ok(Some(lookup)) => print_found(lookup),
            Ok(None) => print_not_found(format!("phase {} not found in ROADMAP.md", id.label())),
            Err(e @ PlanError::DocumentNotFound(_)) => print_not_found(e),
            Err(e) => Err(e).context("failed to read ROADMAP.md"),
        },
        RoadmapSubcommand::Analyze => {
            let analysis = roadmap::analyze(root).context("failed to analyze roadmap")?;
            print_json(&analysis)
        }
    }
}
