//! Error types for flagstore
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Result type alias using FlagStoreError
pub type Result<T> = std::result::Result<T, FlagStoreError>;

/// Unified error type for flagstore operations
///
/// Cloneable so a failed package handle can hand the same error back on
/// every accessor call.
#[derive(Debug, Clone, Error)]
pub enum FlagStoreError {
    // -------------------------------------------------------------------------
    // File Structure Errors (always hard errors)
    // -------------------------------------------------------------------------
    #[error("Malformed storage file header: {0}")]
    MalformedHeader(String),

    #[error("Unsupported storage file version {found} (supported: 1..={max})")]
    UnsupportedVersion { found: u32, max: u32 },

    #[error("Invalid storage file offset: {0}")]
    InvalidStorageFileOffset(String),

    #[error("Unknown stored flag type: {0}")]
    UnknownFlagType(u16),

    // -------------------------------------------------------------------------
    // Resolution Errors
    // -------------------------------------------------------------------------
    #[error("Container not found: {0:?}")]
    ContainerNotFound(String),

    #[error("Package {package} not found in container {container}")]
    PackageNotFound { container: String, package: String },

    #[error("Flag {flag} not found in package {package} of container {container}")]
    FlagNotFound {
        container: String,
        package: String,
        flag: String,
    },

    #[error("Storage system not found: {0}")]
    NewStorageSystemNotFound(String),

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("Cannot read storage file {path}: {source}")]
    CannotReadStorageFile {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },
}

/// Numeric error taxonomy for callers bridging into other runtimes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCode {
    StorageSystemNotFound = 1,
    PackageNotFound = 2,
    ContainerNotFound = 3,
    CannotReadStorageFile = 4,
    FlagNotFound = 5,
    MalformedStorageFile = 6,
}

impl FlagStoreError {
    /// Stable numeric code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MalformedHeader(_)
            | Self::UnsupportedVersion { .. }
            | Self::InvalidStorageFileOffset(_)
            | Self::UnknownFlagType(_) => ErrorCode::MalformedStorageFile,
            Self::ContainerNotFound(_) => ErrorCode::ContainerNotFound,
            Self::PackageNotFound { .. } => ErrorCode::PackageNotFound,
            Self::FlagNotFound { .. } => ErrorCode::FlagNotFound,
            Self::NewStorageSystemNotFound(_) => ErrorCode::StorageSystemNotFound,
            Self::CannotReadStorageFile { .. } => ErrorCode::CannotReadStorageFile,
        }
    }

    /// True for "the thing asked for does not exist" as opposed to a
    /// corrupt or unreadable file
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ContainerNotFound(_)
                | Self::PackageNotFound { .. }
                | Self::FlagNotFound { .. }
                | Self::NewStorageSystemNotFound(_)
        )
    }

    pub(crate) fn cannot_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CannotReadStorageFile {
            path: path.into(),
            source: Arc::new(source),
        }
    }
}
