use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const PLANNING_DIR: &str = ".planning";
pub const PHASES_DIR: &str = ".planning/phases";
pub const BACKLOG_DIR: &str = ".planning/backlog";

pub const ROADMAP_FILE: &str = ".planning/ROADMAP.md";
pub const STATE_FILE: &str = ".planning/STATE.md";
pub const CONFIG_FILE: &str = ".planning/config.json";
pub const MIGRATION_LOG_FILE: &str = ".planning/migration-log.md";
pub const BACKLOG_INDEX_FILE: &str = ".planning/backlog/INDEX.md";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn planning_dir(root: &Path) -> PathBuf {
    root.join(PLANNING_DIR)
}

pub fn phases_dir(root: &Path) -> PathBuf {
    root.join(PHASES_DIR)
}

pub fn backlog_dir(root: &Path) -> PathBuf {
    root.join(BACKLOG_DIR)
}

pub fn roadmap_path(root: &Path) -> PathBuf {
    root.join(ROADMAP_FILE)
}

pub fn state_path(root: &Path) -> PathBuf {
    root.join(STATE_FILE)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn migration_log_path(root: &Path) -> PathBuf {
    root.join(MIGRATION_LOG_FILE)
}

pub fn backlog_index_path(root: &Path) -> PathBuf {
    root.join(BACKLOG_INDEX_FILE)
}

// ---------------------------------------------------------------------------
// Slugs
// ---------------------------------------------------------------------------

/// Turn a free-form title into a kebab-case slug.
///
/// Runs of non-alphanumeric characters collapse to a single `-`; leading and
/// trailing dashes are dropped. Returns `"phase"` when nothing survives.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        "phase".to_string()
    } else {
        slug
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
