//! Typed error definitions for sift.
//! Provides a small set of well-known failure modes for better logs and tests.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SiftError {
    #[error("Integrity check failed for {src} -> {dest}: checksum {src_hash} != {dest_hash}")]
    Integrity {
        src: PathBuf,
        dest: PathBuf,
        src_hash: String,
        dest_hash: String,
    },

    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    #[error("Permission denied on {path}: {context}")]
    PermissionDenied { path: PathBuf, context: String },

    #[error("I/O error during {op} on {path}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Metadata file {path} could not be decoded: {reason}")]
    MetadataDecode { path: PathBuf, reason: String },

    #[error("Path is not under the public or private root: {0}")]
    NotUnderRoot(PathBuf),

    #[error("Refusing to move a directory as a single file: {0}")]
    IsDirectory(PathBuf),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Operation interrupted by user")]
    Interrupted,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SiftError {
    /// Stable numeric code for structured logs.
    pub fn code(&self) -> u16 {
        match self {
            SiftError::Integrity { .. } => 10,
            SiftError::NotFound(_) => 20,
            SiftError::PermissionDenied { .. } => 30,
            SiftError::Io { .. } => 40,
            SiftError::MetadataDecode { .. } => 50,
            SiftError::NotUnderRoot(_) => 60,
            SiftError::IsDirectory(_) => 61,
            SiftError::NotADirectory(_) => 62,
            SiftError::Interrupted => 70,
            SiftError::InvalidConfig(_) => 80,
        }
    }

    /// Map an io::Error onto the typed variants callers branch on.
    pub fn from_io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => SiftError::NotFound(path),
            std::io::ErrorKind::PermissionDenied => SiftError::PermissionDenied {
                path,
                context: format!("{op}: {source}"),
            },
            _ => SiftError::Io { op, path, source },
        }
    }
}
