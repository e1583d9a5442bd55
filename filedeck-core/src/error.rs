use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The filesystem operation that was being attempted when an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FsOperation {
    ListDirectory,
    Stat,
    ReadFile,
    WriteFile,
    CreateFolder,
    Rename,
    Delete,
    Watch,
}

/// Stable, serializable error codes handed to UI consumers so they can render
/// localized messages without parsing error strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCode {
    InvalidName,
    InvalidPath,
    PermissionDenied,
    NotFound,
    IoFailure,
    RenameFailure,
    DeleteFailure,
    ImageTooLarge,
    ReadFailure,
    WatcherFailure,
    InvalidPattern,
    /// A protocol message that could not be parsed. Never produced by
    /// [`WorkspaceError::code`].
    InvalidRequest,
}

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("Invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("Invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("Permission denied: {operation} {}", .path.display())]
    PermissionDenied {
        operation: FsOperation,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Not found: {operation} {}", .path.display())]
    NotFound {
        operation: FsOperation,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to {operation} {}: {source}", .path.display())]
    Io {
        operation: FsOperation,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Rename failed: {} -> {}: {source}", .from.display(), .to.display())]
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Delete failed for {}: {source}", .path.display())]
    DeleteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Image too large: {} is {size} bytes (limit {limit})", .path.display())]
    ImageTooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("Failed to watch {}: {source}", .path.display())]
    WatcherFailed {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("Invalid redaction pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl WorkspaceError {
    /// Wraps an OS error with the attempted operation and path, classifying the
    /// common denial/missing cases so callers can react to them.
    pub fn io(operation: FsOperation, path: impl AsRef<Path>, source: io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        match source.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                operation,
                path,
                source,
            },
            io::ErrorKind::NotFound => Self::NotFound {
                operation,
                path,
                source,
            },
            _ => Self::Io {
                operation,
                path,
                source,
            },
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidName { .. } => ErrorCode::InvalidName,
            Self::InvalidPath { .. } => ErrorCode::InvalidPath,
            Self::PermissionDenied { .. } => ErrorCode::PermissionDenied,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::Io {
                operation: FsOperation::ReadFile,
                ..
            } => ErrorCode::ReadFailure,
            Self::Io { .. } => ErrorCode::IoFailure,
            Self::RenameFailed { .. } => ErrorCode::RenameFailure,
            Self::DeleteFailed { .. } => ErrorCode::DeleteFailure,
            Self::ImageTooLarge { .. } => ErrorCode::ImageTooLarge,
            Self::WatcherFailed { .. } => ErrorCode::WatcherFailure,
            Self::InvalidPattern { .. } => ErrorCode::InvalidPattern,
        }
    }
}

pub type Result<T, E = WorkspaceError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_classification() {
        let denied = WorkspaceError::io(
            FsOperation::ListDirectory,
            "/locked",
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert_eq!(denied.code(), ErrorCode::PermissionDenied);
        assert!(denied.to_string().contains("list_directory"));
        assert!(denied.to_string().contains("/locked"));

        let missing = WorkspaceError::io(
            FsOperation::Stat,
            "/gone",
            io::Error::from(io::ErrorKind::NotFound),
        );
        assert_eq!(missing.code(), ErrorCode::NotFound);

        let other = WorkspaceError::io(
            FsOperation::ReadFile,
            "/dev/odd",
            io::Error::other("boom"),
        );
        assert_eq!(other.code(), ErrorCode::ReadFailure);
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::ImageTooLarge).unwrap();
        assert_eq!(json, "\"image_too_large\"");
        assert_eq!(ErrorCode::RenameFailure.to_string(), "rename_failure");
    }
}
