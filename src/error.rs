//! Central error handling for the warp-mesh pipeline.
//!
//! Every parser reports through `MeshError`; the mesh generator is the
//! recovery boundary and never lets one of these escape to the renderer.

use std::path::Path;

/// Categorized error type for mesh parsing, generation and export.
#[derive(thiserror::Error, Debug)]
pub enum MeshError {
    #[error("failed to open '{path}': {source}")]
    FileNotFound {
        path: String,
        source: std::io::Error,
    },

    #[error("short read in {what}: expected {expected} bytes, got {actual}")]
    ShortRead {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("corrupt header: {0}")]
    CorruptHeader(String),

    #[error("count mismatch in {what}: expected {expected}, got {actual}")]
    CountMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("no parser for mesh '{0}'")]
    UnsupportedFormat(String),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MeshError {
    /// Convenience constructors for common error types
    pub fn file_not_found(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        MeshError::FileNotFound {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub fn short_read<T: ToString>(what: T, expected: usize, actual: usize) -> Self {
        MeshError::ShortRead {
            what: what.to_string(),
            expected,
            actual,
        }
    }

    pub fn corrupt_header<T: ToString>(msg: T) -> Self {
        MeshError::CorruptHeader(msg.to_string())
    }

    pub fn count_mismatch<T: ToString>(what: T, expected: usize, actual: usize) -> Self {
        MeshError::CountMismatch {
            what: what.to_string(),
            expected,
            actual,
        }
    }

    pub fn invalid_geometry<T: ToString>(msg: T) -> Self {
        MeshError::InvalidGeometry(msg.to_string())
    }
}

/// Result type alias for mesh operations
pub type MeshResult<T> = Result<T, MeshError>;
