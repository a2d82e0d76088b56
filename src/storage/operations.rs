//! Storage operations
//!
//! The five file operations, each confined to the sandbox root. Every call is
//! blocking; transports run them on a blocking pool.

use log::debug;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};
use crate::storage::filesystem::{is_temp_name, record_from_metadata, write_atomic};
use crate::storage::locks::PathLocks;
use crate::storage::results::{DeleteResult, FileContent, FileRecord, FileType, ListResult};
use crate::storage::sandbox::{PathSandbox, SandboxPath};

/// File operations over one sandbox root, shared by every transport.
#[derive(Debug)]
pub struct FileStore {
    sandbox: PathSandbox,
    locks: PathLocks,
}

impl FileStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self {
            sandbox: PathSandbox::new(root)?,
            locks: PathLocks::new(),
        })
    }

    pub fn root(&self) -> &Path {
        self.sandbox.root()
    }

    /// Create or replace a file.
    pub fn write(
        &self,
        path: &str,
        content: &[u8],
        file_type: FileType,
        overwrite: bool,
    ) -> StorageResult<FileRecord> {
        let target = self.sandbox.resolve(path)?;
        let _guard = self.locks.lock(&target.absolute);

        if let Some(parent) = target.absolute.parent() {
            create_parents(parent, &target.logical)?;
        }

        match fs::symlink_metadata(&target.absolute) {
            Ok(_) if !overwrite => return Err(StorageError::AlreadyExists(target.logical)),
            Ok(meta) if meta.is_dir() => return Err(StorageError::IsDirectory(target.logical)),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(StorageError::from_io("stat", &target.logical, e)),
        }

        write_atomic(&target.absolute, content, overwrite)
            .map_err(|e| StorageError::from_io("write", &target.logical, e))?;

        let mut record = self.snapshot(&target)?;
        record.id = Some(Uuid::new_v4().to_string());
        record.file_type = Some(file_type);

        debug!(
            "Wrote {} ({} bytes, overwrite={})",
            target.logical, record.size, overwrite
        );
        Ok(record)
    }

    /// Read a file's full content as text.
    pub fn read(&self, path: &str) -> StorageResult<FileContent> {
        let target = self.sandbox.resolve(path)?;
        // One handle for both stat and content so an overwrite cannot split them.
        let mut file = fs::File::open(&target.absolute)
            .map_err(|e| StorageError::from_io("open", &target.logical, e))?;
        let metadata = file
            .metadata()
            .map_err(|e| StorageError::from_io("stat", &target.logical, e))?;

        if metadata.is_dir() {
            return Err(StorageError::IsDirectory(target.logical));
        }

        let mut bytes = Vec::with_capacity(metadata.len() as usize);
        file.read_to_end(&mut bytes)
            .map_err(|e| StorageError::from_io("read", &target.logical, e))?;
        let record = record_from_metadata(&target.logical, &display_name(&target), &metadata);

        Ok(FileContent {
            record,
            content: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }

    /// List the immediate children of a directory.
    ///
    /// A child whose metadata cannot be read is counted in `omitted` instead
    /// of failing the whole listing.
    pub fn list(&self, path: &str) -> StorageResult<ListResult> {
        let target = self.sandbox.resolve(path)?;
        let metadata = fs::metadata(&target.absolute)
            .map_err(|e| StorageError::from_io("stat", &target.logical, e))?;

        if !metadata.is_dir() {
            return Err(StorageError::NotADirectory(target.logical));
        }

        let entries = fs::read_dir(&target.absolute)
            .map_err(|e| StorageError::from_io("list", &target.logical, e))?;

        let mut records = Vec::new();
        let mut omitted = 0;
        for entry in entries {
            let Ok(entry) = entry else {
                omitted += 1;
                continue;
            };
            let name = entry.file_name().to_string_lossy().to_string();
            if is_temp_name(&name) {
                continue;
            }
            match entry.metadata() {
                Ok(meta) => records.push(record_from_metadata(
                    &target.child_logical(&name),
                    &name,
                    &meta,
                )),
                Err(_) => omitted += 1,
            }
        }
        records.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(ListResult {
            path: target.logical,
            entries: records,
            omitted,
        })
    }

    /// Delete a file, or a directory with everything under it.
    ///
    /// A non-empty directory needs `force`. A symlink is removed itself, never
    /// the entry it points at.
    pub fn delete(&self, path: &str, force: bool) -> StorageResult<DeleteResult> {
        let target = self.sandbox.resolve(path)?;
        if target.is_root() {
            return Err(StorageError::AccessDenied(path.to_string()));
        }
        let _guard = self.locks.lock(&target.entry);

        let metadata = fs::symlink_metadata(&target.entry)
            .map_err(|e| StorageError::from_io("stat", &target.logical, e))?;

        let is_dir = metadata.is_dir();
        let removed = if !is_dir {
            fs::remove_file(&target.entry)
        } else if force {
            fs::remove_dir_all(&target.entry)
        } else {
            fs::remove_dir(&target.entry)
        };
        removed.map_err(|e| StorageError::from_io("remove", &target.logical, e))?;

        debug!("Deleted {} (dir={}, force={})", target.logical, is_dir, force);
        Ok(DeleteResult {
            path: target.logical,
            is_dir,
        })
    }

    /// Rename `source` to `dest` atomically.
    ///
    /// Fails with `CrossDeviceMove` instead of falling back to copy+delete.
    /// A symlink source is moved as the link itself.
    pub fn move_entry(&self, source: &str, dest: &str, overwrite: bool) -> StorageResult<FileRecord> {
        let from = self.sandbox.resolve(source)?;
        let to = self.sandbox.resolve(dest)?;
        if from.is_root() {
            return Err(StorageError::AccessDenied(source.to_string()));
        }
        if to.is_root() {
            return Err(StorageError::AccessDenied(dest.to_string()));
        }
        if to.entry != from.entry && to.entry.starts_with(&from.entry) {
            return Err(StorageError::Validation(format!(
                "cannot move {} into itself ({})",
                from.logical, to.logical
            )));
        }
        let _guards = self.locks.lock_pair(&from.entry, &to.entry);

        fs::symlink_metadata(&from.entry)
            .map_err(|e| StorageError::from_io("stat", &from.logical, e))?;

        if from.entry != to.entry {
            match fs::symlink_metadata(&to.entry) {
                Ok(_) if !overwrite => return Err(StorageError::AlreadyExists(to.logical)),
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(StorageError::from_io("stat", &to.logical, e)),
            }
        }

        if let Some(parent) = to.entry.parent() {
            create_parents(parent, &to.logical)?;
        }

        fs::rename(&from.entry, &to.entry)
            .map_err(|e| StorageError::from_rename(&from.logical, &to.logical, e))?;

        debug!("Moved {} -> {}", from.logical, to.logical);
        let metadata = fs::symlink_metadata(&to.entry)
            .map_err(|e| StorageError::from_io("stat", &to.logical, e))?;
        Ok(record_from_metadata(&to.logical, &display_name(&to), &metadata))
    }

    fn snapshot(&self, target: &SandboxPath) -> StorageResult<FileRecord> {
        let metadata = fs::metadata(&target.absolute)
            .map_err(|e| StorageError::from_io("stat", &target.logical, e))?;
        Ok(record_from_metadata(
            &target.logical,
            &display_name(target),
            &metadata,
        ))
    }
}

/// `create_dir_all`, reporting a file in the way as `NotADirectory`.
fn create_parents(parent: &Path, logical: &str) -> StorageResult<()> {
    fs::create_dir_all(parent).map_err(|e| match e.kind() {
        io::ErrorKind::AlreadyExists | io::ErrorKind::NotADirectory => {
            StorageError::NotADirectory(logical.to_string())
        }
        _ => StorageError::from_io("create parent of", logical, e),
    })
}

/// Last logical segment; the root displays as an empty name.
fn display_name(target: &SandboxPath) -> String {
    target
        .logical
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}
