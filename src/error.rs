//! Error types for the store.

use std::io;
use thiserror::Error;

/// Errors surfaced by [`crate::Store`] and the lower-level segment types.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Any underlying read/write/rename/delete failure.
    #[error("io failure: {0}")]
    Io(#[from] io::Error),

    /// A segment's header or a record inside it does not match the fixed
    /// binary layout: a size field points past end-of-file, or bytes that
    /// must be valid UTF-8 are not.
    #[error("malformed segment {path}: {detail}")]
    MalformedSegment { path: String, detail: String },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    pub(crate) fn malformed(path: impl Into<String>, detail: impl Into<String>) -> Self {
        StoreError::MalformedSegment {
            path: path.into(),
            detail: detail.into(),
        }
    }
}
