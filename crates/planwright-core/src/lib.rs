pub mod backlog;
pub mod clock;
pub mod config;
pub mod consistency;
pub mod digest;
pub mod document;
pub mod error;
pub mod frontmatter;
pub mod init;
pub mod io;
pub mod manifest;
pub mod migration_log;
pub mod paths;
pub mod phase;
pub mod phase_id;
pub mod roadmap;
pub mod state;

pub use error::{PlanError, Result};
pub use phase_id::PhaseId;
