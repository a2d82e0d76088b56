//! Request types
//!
//! JSON request bodies accepted on both transports, and the operation names
//! that route them.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{StorageError, StorageResult};
use crate::storage::FileType;

/// One of the five storage operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Write,
    Read,
    List,
    Delete,
    Move,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Write,
        Operation::Read,
        Operation::List,
        Operation::Delete,
        Operation::Move,
    ];

    /// Route segment and bus subject suffix.
    pub fn name(self) -> &'static str {
        match self {
            Operation::Write => "write",
            Operation::Read => "read",
            Operation::List => "list",
            Operation::Delete => "delete",
            Operation::Move => "move",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WriteRequest {
    pub path: String,
    pub content: String,
    #[serde(default, rename = "type")]
    pub file_type: FileType,
    #[serde(default)]
    pub overwrite: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadRequest {
    pub path: String,
}

/// An omitted path lists the root.
#[derive(Debug, Clone, Deserialize)]
pub struct ListRequest {
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteRequest {
    pub path: String,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoveRequest {
    pub source: String,
    pub dest: String,
    #[serde(default)]
    pub overwrite: bool,
}

/// Decode a JSON body; any shape mismatch is a validation error.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> StorageResult<T> {
    serde_json::from_slice(body).map_err(|e| StorageError::Validation(e.to_string()))
}

/// Reject an empty required path field.
pub fn require_path<'a>(field: &str, value: &'a str) -> StorageResult<&'a str> {
    if value.trim().is_empty() {
        return Err(StorageError::Validation(format!("{field} is required")));
    }
    Ok(value)
}
