//! Error type shared by the mender crates.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type MenderResult<T> = Result<T, MenderError>;

#[derive(Debug, Error)]
pub enum MenderError {
    /// The compiler process could not be started at all. A compiler that runs and exits non-zero
    /// is not an error.
    #[error("failed to launch compiler `{program}`: {source}")]
    CompilerLaunch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("project root {} is not a directory", .0.display())]
    InvalidProjectRoot(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed diagnostic JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid rule pattern: {0}")]
    Rule(#[from] regex::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl MenderError {
    /// Wraps an I/O error with the path it occurred on.
    pub fn io(path: &Path, source: io::Error) -> MenderError {
        MenderError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// True for errors that must abort a whole run rather than a single file.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, MenderError::Io { .. })
    }
}
