pub mod config;
pub mod domain;
pub mod error;
pub mod logging;

pub use config::Config;
pub use domain::{FileRecord, GitProvenance, Project, ProjectId, SymbolHints, VersionRecord, line_count};
pub use error::{RewindexError, Result};
