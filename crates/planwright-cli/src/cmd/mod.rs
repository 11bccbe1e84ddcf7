pub mod backlog;
pub mod config;
pub mod frontmatter;
pub mod init;
pub mod manifest;
pub mod phase;
pub mod roadmap;
pub mod summary;
pub mod validate;
