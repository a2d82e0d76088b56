//! Error handlers
//!
//! Maps storage errors onto the structured payload both transports send back.
//! This is the only place the taxonomy is turned into wire form.

use log::{error, warn};
use serde::{Deserialize, Serialize};

use crate::error::types::StorageError;

/// Body of every failed request, on HTTP and on the bus alike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub kind: String,
    pub message: String,
    /// HTTP-equivalent status, repeated in the body for bus callers.
    pub status: u16,
}

/// Convert a storage error to its HTTP-equivalent status code.
pub fn error_status(err: &StorageError) -> u16 {
    match err {
        StorageError::Validation(_) => 400,
        StorageError::AccessDenied(_) => 403,
        StorageError::NotFound(_) => 404,
        StorageError::AlreadyExists(_)
        | StorageError::DirectoryNotEmpty(_)
        | StorageError::IsDirectory(_)
        | StorageError::NotADirectory(_) => 409,
        StorageError::CrossDeviceMove { .. } | StorageError::Io { .. } => 500,
    }
}

pub fn error_payload(err: &StorageError) -> ErrorPayload {
    ErrorPayload {
        error: ErrorDetail {
            kind: err.kind().to_string(),
            message: err.to_string(),
            status: error_status(err),
        },
    }
}

/// Log a failed request at a level matching who is at fault.
pub fn log_failure(transport: &str, operation: &str, err: &StorageError) {
    if err.is_server_fault() {
        error!("{transport} {operation} failed: {err}");
    } else {
        warn!("{transport} {operation} rejected: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn status_mapping() {
        assert_eq!(error_status(&StorageError::Validation("x".into())), 400);
        assert_eq!(error_status(&StorageError::AccessDenied("x".into())), 403);
        assert_eq!(error_status(&StorageError::NotFound("x".into())), 404);
        assert_eq!(error_status(&StorageError::AlreadyExists("x".into())), 409);
        assert_eq!(error_status(&StorageError::DirectoryNotEmpty("x".into())), 409);
        assert_eq!(error_status(&StorageError::IsDirectory("x".into())), 409);
        assert_eq!(error_status(&StorageError::NotADirectory("x".into())), 409);
        assert_eq!(
            error_status(&StorageError::CrossDeviceMove {
                from: "a".into(),
                to: "b".into()
            }),
            500
        );
        assert_eq!(
            error_status(&StorageError::from_io(
                "read",
                "x",
                io::Error::from(io::ErrorKind::PermissionDenied)
            )),
            500
        );
    }

    #[test]
    fn payload_shape() {
        let payload = error_payload(&StorageError::NotFound("notes/a.txt".into()));
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["error"]["kind"], "not_found");
        assert_eq!(json["error"]["status"], 404);
        assert_eq!(json["error"]["message"], "not found: notes/a.txt");
    }
}
