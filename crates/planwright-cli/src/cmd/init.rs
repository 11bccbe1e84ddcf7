use crate::output::print_json;
use anyhow::Context;
use planwright_core::{clock, init, manifest::FeatureManifest};
use std::path::Path;

pub fn run(root: &Path, name: Option<&str>, manifest_path: Option<&Path>) -> anyhow::Result<()> {
    let project_name = name.map(str::to_string).unwrap_or_else(|| {
        root.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string())
    });
    let manifest = FeatureManifest::load(manifest_path).context("failed to load feature manifest")?;
    let report = init::init_project(root, &project_name, &manifest, &clock::today())
        .with_context(|| format!("failed to initialize {}", root.display()))?;
    print_json(&report)
}
