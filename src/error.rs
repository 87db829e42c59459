//src/error.rs

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Every failure the clustering pipeline can report.
#[derive(Debug, Error)]
pub enum AgcError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{} does not exist.", display_name(.0))]
    InputNotFound(PathBuf),

    #[error("{} is a directory.", display_name(.0))]
    InputIsDirectory(PathBuf),

    /// A sequence cannot be cut into whole chunks of the requested size.
    #[error("cannot cut a {len}nt sequence into chunks of {chunk_size}: {reason}")]
    InvalidChunking {
        len: usize,
        chunk_size: usize,
        reason: &'static str,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("substitution matrix, line {line}: {detail}")]
    MatrixFormat { line: usize, detail: String },
}

pub type Result<T> = std::result::Result<T, AgcError>;

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
