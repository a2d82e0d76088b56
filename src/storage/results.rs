//! Storage result types
//!
//! Snapshots returned by storage operations. None of these are persisted;
//! each is rebuilt from the filesystem on every request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Caller-supplied tag with no meaning to the filesystem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    #[default]
    Raw,
    Card,
    Note,
    Article,
}

/// Metadata snapshot of one filesystem entry at query time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Minted on write only. Response-scoped; not a stable key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub path: String,
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<FileType>,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub is_dir: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// A file's metadata plus its full text, produced only by read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileContent {
    #[serde(flatten)]
    pub record: FileRecord,
    pub content: String,
}

/// Immediate children of a directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResult {
    pub path: String,
    pub entries: Vec<FileRecord>,
    /// Children skipped because their metadata could not be read.
    pub omitted: usize,
}

impl ListResult {
    pub fn is_partial(&self) -> bool {
        self.omitted > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteResult {
    pub path: String,
    pub is_dir: bool,
}
