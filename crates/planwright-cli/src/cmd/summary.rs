use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use planwright_core::digest;
use std::path::Path;

#[derive(Subcommand)]
pub enum SummarySubcommand {
    /// Aggregate provides, key decisions and tags from every SUMMARY file
    Digest,
}

pub fn run(root: &Path, subcmd: SummarySubcommand) -> anyhow::Result<()> {
    match subcmd {
        SummarySubcommand::Digest => {
            let digest = digest::digest(root).context("failed to read phase summaries")?;
            print_json(&digest)
        }
    }
}
