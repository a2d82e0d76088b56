//! File system helpers
//!
//! Metadata snapshots and the temp-file-plus-rename write used by the store.

use chrono::{DateTime, Utc};
use std::fs::Metadata;
use std::io::{self, Write};
use std::path::Path;
use tempfile::Builder;

use crate::storage::results::FileRecord;

/// In-flight writes live next to their target under this prefix.
pub const TEMP_PREFIX: &str = ".fs-tmp-";
const TEMP_SUFFIX: &str = ".tmp";

/// True for names produced by [`write_atomic`] before the final rename.
pub fn is_temp_name(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX)
}

/// Build a record from already-fetched metadata.
pub fn record_from_metadata(logical: &str, name: &str, metadata: &Metadata) -> FileRecord {
    let is_dir = metadata.is_dir();
    let modified = metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| DateTime::<Utc>::from(std::time::UNIX_EPOCH));

    let (extension, mime_type) = if is_dir {
        (None, None)
    } else {
        (
            Path::new(name)
                .extension()
                .map(|ext| ext.to_string_lossy().to_string()),
            mime_guess::from_path(name).first_raw().map(str::to_string),
        )
    };

    FileRecord {
        id: None,
        path: logical.to_string(),
        name: name.to_string(),
        file_type: None,
        size: if is_dir { 0 } else { metadata.len() },
        modified,
        is_dir,
        extension,
        mime_type,
    }
}

/// Write `content` to a temp file in the target's directory, flush it to disk,
/// then rename it over `target`.
///
/// With `overwrite` unset the rename refuses to replace an existing entry, so
/// a target created between the caller's existence check and the rename still
/// fails with `AlreadyExists`. On any failure the temp file is removed.
pub fn write_atomic(target: &Path, content: &[u8], overwrite: bool) -> io::Result<()> {
    let parent = target
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "target has no parent"))?;

    let mut temp = Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(parent)?;
    temp.write_all(content)?;
    temp.flush()?;
    temp.as_file().sync_all()?;

    let persisted = if overwrite {
        temp.persist(target)
    } else {
        temp.persist_noclobber(target)
    };
    persisted.map(|_| ()).map_err(|e| e.error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_leaves_no_temp_behind() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("a.txt");

        write_atomic(&target, b"hello", false).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "hello");

        let names: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.txt".to_string()]);
    }

    #[test]
    fn noclobber_refuses_existing_target() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("a.txt");
        fs::write(&target, "old").unwrap();

        let err = write_atomic(&target, b"new", false).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(&target).unwrap(), "old");

        write_atomic(&target, b"new", true).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
    }

    #[test]
    fn record_fills_extension_and_mime_for_files() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("page.txt");
        fs::write(&path, "# hi").unwrap();

        let record = record_from_metadata("docs/page.txt", "page.txt", &fs::metadata(&path).unwrap());
        assert_eq!(record.size, 4);
        assert!(!record.is_dir);
        assert_eq!(record.extension.as_deref(), Some("txt"));
        assert_eq!(record.mime_type.as_deref(), Some("text/plain"));

        let dir = record_from_metadata("docs", "docs", &fs::metadata(tmp.path()).unwrap());
        assert!(dir.is_dir);
        assert_eq!(dir.size, 0);
        assert!(dir.extension.is_none());
    }

    #[test]
    fn temp_names_are_recognized() {
        assert!(is_temp_name(".fs-tmp-abc123.tmp"));
        assert!(!is_temp_name("notes.tmp"));
    }
}
