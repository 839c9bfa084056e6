use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("command not found: {cmd}")]
    CommandNotFound { cmd: String },

    #[error("command failed: {cmd}, source: {source}")]
    CommandFailed { cmd: String, source: std::io::Error },

    #[error("command timed out after {timeout:?}: {cmd}")]
    Timeout { cmd: String, timeout: Duration },

    #[error("working directory is not a directory: {0}")]
    InvalidCwd(std::path::PathBuf),

    #[error("failed to join PATH entries")]
    JoinPaths,
}
