mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    backlog::BacklogSubcommand, config::ConfigSubcommand, frontmatter::FrontmatterSubcommand,
    manifest::ManifestSubcommand, phase::PhaseSubcommand, roadmap::RoadmapSubcommand,
    summary::SummarySubcommand, validate::ValidateSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "pw",
    about = "Planning document engine: phases, roadmap, state, backlog and config as plain files",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .planning/ or .git/)
    #[arg(long, global = true, env = "PLANWRIGHT_ROOT")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .planning/ with ROADMAP.md, STATE.md and config.json
    Init {
        /// Project name for the templates (default: root directory name)
        #[arg(long)]
        name: Option<String>,
        /// Feature manifest to seed config.json from (default: built-in)
        #[arg(long)]
        manifest: Option<PathBuf>,
    },

    /// Add, insert, remove and complete phases
    Phase {
        #[command(subcommand)]
        subcommand: PhaseSubcommand,
    },

    /// Read ROADMAP.md
    Roadmap {
        #[command(subcommand)]
        subcommand: RoadmapSubcommand,
    },

    /// Check and migrate config.json against the feature manifest
    Manifest {
        /// Feature manifest file (default: built-in)
        #[arg(long, global = true)]
        manifest: Option<PathBuf>,
        #[command(subcommand)]
        subcommand: ManifestSubcommand,
    },

    /// Validate planning documents
    Validate {
        #[command(subcommand)]
        subcommand: ValidateSubcommand,
    },

    /// Manage parked ideas under .planning/backlog/
    Backlog {
        #[command(subcommand)]
        subcommand: BacklogSubcommand,
    },

    /// Read and write config.json
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Read and edit document frontmatter
    Frontmatter {
        #[command(subcommand)]
        subcommand: FrontmatterSubcommand,
    },

    /// Aggregate phase summaries
    Summary {
        #[command(subcommand)]
        subcommand: SummarySubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init { name, manifest } => {
            cmd::init::run(&root, name.as_deref(), manifest.as_deref())
        }
        Commands::Phase { subcommand } => cmd::phase::run(&root, subcommand),
        Commands::Roadmap { subcommand } => cmd::roadmap::run(&root, subcommand),
        Commands::Manifest {
            manifest,
            subcommand,
        } => cmd::manifest::run(&root, manifest.as_deref(), subcommand),
        Commands::Validate { subcommand } => cmd::validate::run(&root, subcommand),
        Commands::Backlog { subcommand } => cmd::backlog::run(&root, subcommand),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand),
        Commands::Frontmatter { subcommand } => cmd::frontmatter::run(&root, subcommand),
        Commands::Summary { subcommand } => cmd::summary::run(&root, subcommand),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
