//! Path sandbox
//!
//! Resolves caller-supplied paths against the fixed storage root and rejects
//! anything that would land outside it.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::{StorageError, StorageResult};
use crate::storage::filesystem::is_temp_name;

/// A caller path after it has been confined to the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxPath {
    /// Canonical host location, always inside the root.
    pub absolute: PathBuf,
    /// The named entry itself: canonical parent joined with the last segment.
    /// Differs from `absolute` when the last segment is a symlink.
    pub entry: PathBuf,
    /// Normalized root-relative form, `/`-separated. Empty for the root itself.
    pub logical: String,
}

impl SandboxPath {
    pub fn is_root(&self) -> bool {
        self.logical.is_empty()
    }

    /// Logical path of a direct child of this entry.
    pub fn child_logical(&self, name: &str) -> String {
        if self.logical.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.logical, name)
        }
    }
}

/// Stateless containment check bound to one canonical root.
#[derive(Debug, Clone)]
pub struct PathSandbox {
    root: PathBuf,
}

impl PathSandbox {
    /// Creates the root if absent and pins its canonical form.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.canonicalize()?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `raw` to a location inside the root.
    ///
    /// Leading separators are treated as root-relative. `..` segments are
    /// applied lexically first and may never climb above the root; the result
    /// is then canonicalized through its longest existing ancestor so that
    /// symlinks are followed, and the resolved location must still be a
    /// component-wise descendant of the root.
    pub fn resolve(&self, raw: &str) -> StorageResult<SandboxPath> {
        if raw.contains('\0') {
            return Err(StorageError::Validation(
                "path cannot contain NUL characters".into(),
            ));
        }

        let mut segments: Vec<&str> = Vec::new();
        for component in Path::new(raw.trim_start_matches('/')).components() {
            match component {
                Component::Normal(seg) => match seg.to_str() {
                    Some(seg) if is_temp_name(seg) => {
                        return Err(StorageError::Validation(format!(
                            "path uses a reserved name: {seg}"
                        )));
                    }
                    Some(seg) => segments.push(seg),
                    None => {
                        return Err(StorageError::Validation(format!(
                            "path is not valid UTF-8: {raw}"
                        )));
                    }
                },
                Component::CurDir => {}
                Component::ParentDir => {
                    if segments.pop().is_none() {
                        return Err(StorageError::AccessDenied(raw.to_string()));
                    }
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(StorageError::AccessDenied(raw.to_string()));
                }
            }
        }

        let logical = segments.join("/");
        let lexical = segments
            .iter()
            .fold(self.root.clone(), |path, seg| path.join(seg));
        let absolute = canonicalize_existing_prefix(&lexical)
            .map_err(|e| StorageError::from_io("resolve", &logical, e))?;

        if !absolute.starts_with(&self.root) {
            return Err(StorageError::AccessDenied(raw.to_string()));
        }

        let entry = match segments.split_last() {
            None => self.root.clone(),
            Some((last, parents)) => {
                let parent = parents
                    .iter()
                    .fold(self.root.clone(), |path, seg| path.join(seg));
                canonicalize_existing_prefix(&parent)
                    .map_err(|e| StorageError::from_io("resolve", &logical, e))?
                    .join(last)
            }
        };
        if !entry.starts_with(&self.root) {
            return Err(StorageError::AccessDenied(raw.to_string()));
        }

        Ok(SandboxPath {
            absolute,
            entry,
            logical,
        })
    }
}

/// Canonicalize the longest existing ancestor of `path` and re-append the
/// components that do not exist yet.
fn canonicalize_existing_prefix(path: &Path) -> io::Result<PathBuf> {
    let mut existing = path.to_path_buf();
    let mut missing = Vec::new();

    loop {
        match existing.canonicalize() {
            Ok(canonical) => {
                return Ok(missing
                    .into_iter()
                    .rev()
                    .fold(canonical, |acc: PathBuf, name| acc.join(name)));
            }
            Err(e)
                if e.kind() == io::ErrorKind::NotFound
                    || e.kind() == io::ErrorKind::NotADirectory =>
            {
                let Some(name) = existing.file_name().map(|n| n.to_os_string()) else {
                    return Err(e);
                };
                missing.push(name);
                if !existing.pop() {
                    return Err(e);
                }
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sandbox() -> (TempDir, PathSandbox) {
        let tmp = TempDir::new().unwrap();
        let sandbox = PathSandbox::new(tmp.path().join("data")).unwrap();
        (tmp, sandbox)
    }

    #[test]
    fn resolves_nested_missing_paths() {
        let (_tmp, sb) = sandbox();
        let resolved = sb.resolve("notes/deep/a.txt").unwrap();
        assert_eq!(resolved.logical, "notes/deep/a.txt");
        assert_eq!(resolved.absolute, sb.root().join("notes/deep/a.txt"));
    }

    #[test]
    fn normalizes_dots_and_separators() {
        let (_tmp, sb) = sandbox();
        let resolved = sb.resolve("/a/./b//c/../d").unwrap();
        assert_eq!(resolved.logical, "a/b/d");
        assert!(sb.resolve("").unwrap().is_root());
        assert_eq!(sb.resolve("").unwrap().entry, sb.root());
        assert!(sb.resolve("a/..").unwrap().is_root());
    }

    #[test]
    fn rejects_parent_escape() {
        let (_tmp, sb) = sandbox();
        for raw in ["../secret", "a/../../secret", "..", "a/b/../../../x"] {
            let err = sb.resolve(raw).unwrap_err();
            assert!(matches!(err, StorageError::AccessDenied(_)), "{raw}: {err}");
        }
    }

    #[test]
    fn rejects_sibling_sharing_textual_prefix() {
        let (tmp, sb) = sandbox();
        fs::create_dir_all(tmp.path().join("data-other")).unwrap();
        let err = sb.resolve("../data-other/x").unwrap_err();
        assert!(matches!(err, StorageError::AccessDenied(_)));
    }

    #[test]
    fn rejects_nul() {
        let (_tmp, sb) = sandbox();
        assert!(matches!(
            sb.resolve("a\0b"),
            Err(StorageError::Validation(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn rejects_symlink_leaving_root() {
        let (tmp, sb) = sandbox();
        let outside = tmp.path().join("outside");
        fs::create_dir_all(&outside).unwrap();
        std::os::unix::fs::symlink(&outside, sb.root().join("link")).unwrap();

        assert!(matches!(
            sb.resolve("link/secret.txt"),
            Err(StorageError::AccessDenied(_))
        ));
        assert!(matches!(sb.resolve("link"), Err(StorageError::AccessDenied(_))));
    }

    #[cfg(unix)]
    #[test]
    fn follows_symlink_inside_root() {
        let (_tmp, sb) = sandbox();
        fs::create_dir_all(sb.root().join("real")).unwrap();
        std::os::unix::fs::symlink(sb.root().join("real"), sb.root().join("alias")).unwrap();

        let resolved = sb.resolve("alias/x.txt").unwrap();
        assert_eq!(resolved.logical, "alias/x.txt");
        assert_eq!(resolved.absolute, sb.root().join("real/x.txt"));
        assert_eq!(resolved.entry, sb.root().join("real/x.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn entry_keeps_trailing_symlink() {
        let (_tmp, sb) = sandbox();
        fs::create_dir_all(sb.root().join("real")).unwrap();
        std::os::unix::fs::symlink(sb.root().join("real"), sb.root().join("alias")).unwrap();

        let resolved = sb.resolve("alias").unwrap();
        assert_eq!(resolved.absolute, sb.root().join("real"));
        assert_eq!(resolved.entry, sb.root().join("alias"));
    }

    #[test]
    fn rejects_reserved_temp_names() {
        let (_tmp, sb) = sandbox();
        for raw in ["d/.fs-tmp-mine.tmp", ".fs-tmp-x.tmp/child"] {
            assert!(
                matches!(sb.resolve(raw), Err(StorageError::Validation(_))),
                "{raw}"
            );
        }
        assert!(sb.resolve("d/.fs-tmp-notes.txt").is_ok());
    }

    #[test]
    fn file_used_as_directory_still_resolves_inside() {
        let (_tmp, sb) = sandbox();
        fs::write(sb.root().join("plain"), "x").unwrap();
        let resolved = sb.resolve("plain/child").unwrap();
        assert_eq!(resolved.absolute, sb.root().join("plain/child"));
        assert_eq!(resolved.entry, sb.root().join("plain/child"));
    }
}
