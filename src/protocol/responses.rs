//! Response encoding
//!
//! Turns an operation result into the status and JSON body sent back on
//! either transport.

use serde::Serialize;
use serde_json::{Value, json};

use crate::error::{StorageError, StorageResult, error_payload, error_status};

pub const STATUS_OK: u16 = 200;

/// Transport-neutral outcome of one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
}

impl Reply {
    pub fn ok(body: Value) -> Self {
        Self {
            status: STATUS_OK,
            body,
        }
    }

    pub fn from_error(err: &StorageError) -> Self {
        Self {
            status: error_status(err),
            body: json!(error_payload(err)),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        // Serializing a `Value` cannot fail.
        serde_json::to_vec(&self.body).unwrap_or_default()
    }
}

/// Serialize a success payload.
pub fn to_body<T: Serialize>(value: &T) -> StorageResult<Value> {
    serde_json::to_value(value).map_err(|e| StorageError::Io {
        context: "encode",
        path: String::new(),
        source: e.into(),
    })
}

/// Fixed liveness body; touches neither the filesystem nor the bus.
pub fn health_body() -> Value {
    json!({ "status": "ok" })
}
