//! Field access for the prose `STATE.md` document.
//!
//! Fields are lines of the form `**Field:** value` (or `Field: value`).
//! Edits replace the value in place and leave every other byte alone.

use crate::document::{read_optional, write_document_atomic};
use crate::error::Result;
use crate::paths;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const CURRENT_PHASE: &str = "Current Phase";
pub const CURRENT_PHASE_NAME: &str = "Current Phase Name";
pub const TOTAL_PHASES: &str = "Total Phases";
pub const CURRENT_PLAN: &str = "Current Plan";
pub const STATUS: &str = "Status";
pub const LAST_ACTIVITY: &str = "Last Activity";

pub const PLAN_NOT_STARTED: &str = "Not started";
pub const STATUS_READY_TO_PLAN: &str = "Ready to plan";
pub const STATUS_MILESTONE_COMPLETE: &str = "Milestone complete";

static FIELD_RE: OnceLock<Regex> = OnceLock::new();

fn field_re() -> &'static Regex {
    FIELD_RE.get_or_init(|| {
        Regex::new(
            r"(?m)^(?:\*\*(?P<bold>[^*\r\n:]+):\*\*|(?P<plain>[A-Za-z][A-Za-z ]*):)[ \t]*(?P<value>[^\r\n]*)$",
        )
        .unwrap()
    })
}

/// Span of the value of the first line naming exactly `field`.
fn find_value<'a>(content: &'a str, field: &str) -> Option<regex::Match<'a>> {
    field_re()
        .captures_iter(content)
        .find(|c| c.name("bold").or_else(|| c.name("plain")).map(|n| n.as_str()) == Some(field))
        .and_then(|c| c.name("value"))
}

pub fn get_field(content: &str, field: &str) -> Option<String> {
    find_value(content, field).map(|m| m.as_str().trim().to_string())
}

/// Replace the value of `field`. Returns `None` when the field is absent.
pub fn replace_field(content: &str, field: &str, value: &str) -> Option<String> {
    let m = find_value(content, field)?;
    let mut out = String::with_capacity(content.len() + value.len());
    out.push_str(&content[..m.start()]);
    out.push_str(value);
    out.push_str(&content[m.end()..]);
    Some(out)
}

// ---------------------------------------------------------------------------
// ProjectState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ProjectState {
    path: PathBuf,
    content: String,
    dirty: bool,
}

impl ProjectState {
    /// Load `STATE.md`, or `None` when the project has no state document.
    pub fn load(root: &Path) -> Result<Option<Self>> {
        let path = paths::state_path(root);
        Ok(read_optional(&path)?.map(|content| Self {
            path,
            content,
            dirty: false,
        }))
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn field(&self, name: &str) -> Option<String> {
        get_field(&self.content, name)
    }

    /// Set an existing field. Missing fields are left missing.
    pub fn set_field(&mut self, name: &str, value: &str) -> bool {
        match replace_field(&self.content, name, value) {
            Some(updated) => {
                if updated != self.content {
                    self.content = updated;
                    self.dirty = true;
                }
                true
            }
            None => false,
        }
    }

    /// Add `delta` to the `Total Phases` counter, flooring at zero.
    pub fn adjust_total_phases(&mut self, delta: i64) -> bool {
        let Some(current) = self.field(TOTAL_PHASES).and_then(|v| v.parse::<i64>().ok()) else {
            return false;
        };
        let next = (current + delta).max(0);
        self.set_field(TOTAL_PHASES, &next.to_string())
    }

    pub fn save(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        write_document_atomic(&self.path, &self.content)?;
        self.dirty = false;
        Ok(true)
    }
}

/// Initial `STATE.md` written by `init`.
pub fn template(project: &str, date: &str) -> String {
    format!(
        "# Project State: {project}\n\
         \n\
         ## Current Position\n\
         \n\
         **Current Phase:** 01\n\
         **Current Phase Name:** \n\
         **Total Phases:** 0\n\
         **Current Plan:** {PLAN_NOT_STARTED}\n\
         **Status:** {STATUS_READY_TO_PLAN}\n\
         **Last Activity:** {date}\n\
         \n\
         ## Decisions\n\
         \n\
         ## Blockers\n"
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
