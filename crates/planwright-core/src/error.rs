use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("not initialized: run 'pw init'")]
    NotInitialized,

    #[error("document not found: {}", .0.display())]
    DocumentNotFound(PathBuf),

    #[error("phase not found: {0}")]
    PhaseNotFound(String),

    #[error("invalid phase id '{0}': expected digits with an optional .N suffix")]
    InvalidPhaseId(String),

    #[error(
        "phase {phase} has {summaries} executed plan(s) with summaries; use --force to remove it anyway"
    )]
    HasExecutedWork { phase: String, summaries: usize },

    #[error("phase {phase} has non-contiguous {kind} numbering ({found}); refusing to renumber")]
    NonContiguousPlans {
        phase: String,
        kind: String,
        found: String,
    },

    #[error("rename target already exists: {}", .0.display())]
    RenameCollision(PathBuf),

    #[error("feature not found in manifest: {0}")]
    FeatureNotFound(String),

    #[error("backlog item not found: {0}")]
    BacklogItemNotFound(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("document has no frontmatter: {}", .0.display())]
    MissingFrontmatter(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PlanError>;
