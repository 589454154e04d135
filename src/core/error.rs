//! Error types for the file organizer
//!
//! Directory-level failures (`NotFound`, `AccessDenied` on a root) abort the
//! operation that needed the directory. File-level failures are recoverable:
//! batch operations record them and move on to the next file.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main error type for the file organizer
#[derive(Error, Debug)]
pub enum OrganizerError {
    /// A required root or source directory does not exist
    #[error("Directory not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Permission failure reading or writing a path
    #[error("Access denied for '{}': {message}", .path.display())]
    AccessDenied { path: PathBuf, message: String },

    /// Any I/O failure scoped to a single file
    #[error("Failed to process '{}': {message}", .path.display())]
    PerFileFailure { path: PathBuf, message: String },

    /// A move could not complete after the destination was resolved
    #[error("Failed to move '{}' to {category}: {message}", .path.display())]
    RelocationFailed {
        path: PathBuf,
        category: String,
        message: String,
    },

    /// The shutdown flag was raised before the operation finished
    #[error("Operation cancelled")]
    Cancelled,

    /// General I/O error
    #[error("IO error: {0}")]
    IoError(String),
}

impl OrganizerError {
    /// Map an error raised while opening a directory that the whole
    /// operation depends on.
    pub fn for_directory(path: &Path, err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => OrganizerError::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => OrganizerError::AccessDenied {
                path: path.to_path_buf(),
                message: err.to_string(),
            },
            _ => OrganizerError::IoError(format!("{}: {}", path.display(), err)),
        }
    }

    /// Wrap an error that only affects one file.
    pub fn for_file(path: &Path, err: impl std::fmt::Display) -> Self {
        OrganizerError::PerFileFailure {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, OrganizerError>;

impl From<io::Error> for OrganizerError {
    fn from(err: io::Error) -> Self {
        OrganizerError::IoError(err.to_string())
    }
}
