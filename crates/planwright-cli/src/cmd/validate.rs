use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use planwright_core::consistency;
use std::path::Path;

#[derive(Subcommand)]
pub enum ValidateSubcommand {
    /// Cross-check ROADMAP.md against the phase directories
    Consistency,
}

pub fn run(root: &Path, subcmd: ValidateSubcommand) -> anyhow::Result<()> {
    match subcmd {
        ValidateSubcommand::Consistency => {
            let report = consistency::validate_consistency(root)
                .context("failed to validate planning documents")?;
            print_json(&report)
        }
    }
}
