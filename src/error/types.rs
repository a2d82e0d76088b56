//! Error types
//!
//! Defines the error taxonomy returned by every storage operation.

use std::io;
use thiserror::Error;

/// Storage errors. Paths carried here are always logical (root-relative),
/// never host paths.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Malformed request or missing required field.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Path resolves outside the sandbox root.
    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Write target present without overwrite.
    #[error("already exists (use overwrite=true to replace): {0}")]
    AlreadyExists(String),

    /// Delete target is a non-empty directory without force.
    #[error("directory not empty (use force=true to delete anyway): {0}")]
    DirectoryNotEmpty(String),

    #[error("is a directory, use list instead: {0}")]
    IsDirectory(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Rename spans two devices; the caller decides whether to copy.
    #[error("cannot move {from} to {to}: crosses devices")]
    CrossDeviceMove { from: String, to: String },

    #[error("failed to {context} {path}: {source}")]
    Io {
        context: &'static str,
        path: String,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    /// Stable snake_case name used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            StorageError::Validation(_) => "validation_error",
            StorageError::AccessDenied(_) => "access_denied",
            StorageError::NotFound(_) => "not_found",
            StorageError::AlreadyExists(_) => "already_exists",
            StorageError::DirectoryNotEmpty(_) => "directory_not_empty",
            StorageError::IsDirectory(_) => "is_directory",
            StorageError::NotADirectory(_) => "not_a_directory",
            StorageError::CrossDeviceMove { .. } => "cross_device_move",
            StorageError::Io { .. } => "io_error",
        }
    }

    /// Server-fault errors are the operator's problem, not the caller's.
    pub fn is_server_fault(&self) -> bool {
        matches!(
            self,
            StorageError::Io { .. } | StorageError::CrossDeviceMove { .. }
        )
    }

    /// Classifies an OS error raised while touching `path`.
    pub fn from_io(context: &'static str, path: &str, error: io::Error) -> Self {
        let path = path.to_string();
        match error.kind() {
            io::ErrorKind::NotFound => StorageError::NotFound(path),
            io::ErrorKind::AlreadyExists => StorageError::AlreadyExists(path),
            io::ErrorKind::IsADirectory => StorageError::IsDirectory(path),
            io::ErrorKind::NotADirectory => StorageError::NotADirectory(path),
            io::ErrorKind::DirectoryNotEmpty => StorageError::DirectoryNotEmpty(path),
            _ => StorageError::Io {
                context,
                path,
                source: error,
            },
        }
    }

    /// Classifies a failed rename of `from` onto `to`.
    pub fn from_rename(from: &str, to: &str, error: io::Error) -> Self {
        if error.kind() == io::ErrorKind::CrossesDevices {
            StorageError::CrossDeviceMove {
                from: from.to_string(),
                to: to.to_string(),
            }
        } else {
            StorageError::from_io("move", from, error)
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_kinds_map_onto_taxonomy() {
        let err = StorageError::from_io("read", "a.txt", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, StorageError::NotFound(p) if p == "a.txt"));

        let err = StorageError::from_io(
            "remove",
            "dir",
            io::Error::from(io::ErrorKind::DirectoryNotEmpty),
        );
        assert_eq!(err.kind(), "directory_not_empty");

        let err = StorageError::from_io(
            "write",
            "x",
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert_eq!(err.kind(), "io_error");
        assert!(err.is_server_fault());
    }

    #[test]
    fn rename_across_devices_is_its_own_kind() {
        let err = StorageError::from_rename(
            "a/x",
            "b/x",
            io::Error::from(io::ErrorKind::CrossesDevices),
        );
        assert!(matches!(
            &err,
            StorageError::CrossDeviceMove { from, to } if from == "a/x" && to == "b/x"
        ));
        assert_eq!(err.kind(), "cross_device_move");
        assert_eq!(crate::error::error_status(&err), 500);
        assert!(err.is_server_fault());

        let err = StorageError::from_rename("a/x", "b/x", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, StorageError::NotFound(p) if p == "a/x"));
    }

    #[test]
    fn io_message_keeps_context_and_os_text() {
        let err = StorageError::from_io(
            "write",
            "notes/a.txt",
            io::Error::new(io::ErrorKind::Other, "disk on fire"),
        );
        assert_eq!(err.to_string(), "failed to write notes/a.txt: disk on fire");
    }
}
