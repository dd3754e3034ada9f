use std::path::PathBuf;

/// The seven error kinds the core surfaces at its public boundary.
#[derive(Debug, thiserror::Error)]
pub enum RewindexError {
  #[error("backend unreachable: {0}")]
  BackendUnreachable(String),

  #[error("backend reported error ({status}): {body}")]
  BackendError { status: u16, body: String },

  #[error("invalid argument: {0}")]
  InvalidArgument(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("io error at {path:?}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("parse error: {0}")]
  Parse(String),

  #[error("conflict: {0}")]
  Conflict(String),
}

impl RewindexError {
  pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    RewindexError::Io { path: path.into(), source }
  }
}

pub type Result<T> = std::result::Result<T, RewindexError>;
