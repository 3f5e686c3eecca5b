//! Shared directory management.
//!
//! The shared directory is the single folder cubby exports, over both SMB and
//! HTTP. This module owns its lifecycle: creating it on load, listing its
//! files, and mapping untrusted client-supplied names onto paths inside it.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid file name: {name:?}")]
    InvalidName { name: String },

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    /// Create an InvalidName error
    pub fn invalid_name(name: impl Into<String>) -> Self {
        StorageError::InvalidName { name: name.into() }
    }

    /// Create an Io error with path context
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A regular file inside the shared directory.
#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry {
    /// Bare file name (no directory part)
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Last modification time, if the filesystem reports one
    pub modified: Option<DateTime<Local>>,
}

/// Handle to the shared directory.
///
/// All path construction for client-supplied names goes through [`resolve`],
/// which confines them to a flat namespace directly under the root. Nothing
/// here ever builds a path from raw request input.
///
/// [`resolve`]: SharedDir::resolve
#[derive(Debug, Clone)]
pub struct SharedDir {
    root: PathBuf,
}

impl SharedDir {
    /// Create a handle for the given root path (does not touch the filesystem)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root path of the shared directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the shared directory if it doesn't exist yet.
    ///
    /// Fails if the path exists but is something other than a directory.
    pub fn ensure(&self) -> StorageResult<()> {
        if self.root.is_dir() {
            debug!(path = %self.root.display(), "Shared directory already exists");
            return Ok(());
        }

        fs::create_dir_all(&self.root).map_err(|e| StorageError::io(&self.root, e))?;
        info!(path = %self.root.display(), "Created shared directory");
        Ok(())
    }

    /// Map a client-supplied file name onto a path inside the shared directory.
    ///
    /// The name must be a single bare path component: no separators, no `.` or
    /// `..`, not absolute, not empty. Anything else is rejected so request
    /// input can never escape the root.
    pub fn resolve(&self, name: &str) -> StorageResult<PathBuf> {
        if name.is_empty() || name.contains('\\') {
            return Err(StorageError::invalid_name(name));
        }

        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(name)),
            _ => Err(StorageError::invalid_name(name)),
        }
    }

    /// List the regular files in the shared directory, sorted by name.
    ///
    /// Subdirectories are skipped; so are files whose names aren't valid
    /// UTF-8, since they can't be addressed over HTTP. Entries that vanish
    /// mid-listing are skipped rather than failing the whole listing.
    pub fn entries(&self) -> StorageResult<Vec<FileEntry>> {
        let read_dir = fs::read_dir(&self.root).map_err(|e| StorageError::io(&self.root, e))?;

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| StorageError::io(&self.root, e))?;

            let file_type = match entry.file_type() {
                Ok(ft) => ft,
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            if !file_type.is_file() {
                debug!(path = %entry.path().display(), "Skipping non-file entry");
                continue;
            }

            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    warn!(name = ?raw, "Skipping file with non-UTF-8 name");
                    continue;
                }
            };

            let metadata = match entry.metadata() {
                Ok(md) => md,
                Err(e) => {
                    warn!(file = %name, error = %e, "Skipping entry without metadata");
                    continue;
                }
            };

            entries.push(FileEntry {
                name,
                size: metadata.len(),
                modified: metadata.modified().ok().map(DateTime::<Local>::from),
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// List just the file names, sorted
    pub fn file_names(&self) -> StorageResult<Vec<String>> {
        Ok(self.entries()?.into_iter().map(|e| e.name).collect())
    }

    /// Delete a file from the shared directory
    pub fn remove(&self, name: &str) -> StorageResult<()> {
        let path = self.resolve(name)?;
        fs::remove_file(&path).map_err(|e| StorageError::io(&path, e))?;
        info!(file = name, "Deleted file from shared directory");
        Ok(())
    }
}

/// Format a byte count for display (binary units, one decimal place)
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("nested").join("shared");
        let shared = SharedDir::new(&root);

        shared.ensure().unwrap();
        assert!(root.is_dir());

        // Idempotent
        shared.ensure().unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn test_ensure_fails_when_path_is_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("occupied");
        fs::write(&root, b"not a directory").unwrap();

        let shared = SharedDir::new(&root);
        let result = shared.ensure();
        assert!(matches!(result, Err(StorageError::Io { .. })));
    }

    #[test]
    fn test_resolve_valid_name() {
        let shared = SharedDir::new("/srv/shared");
        let path = shared.resolve("photo.jpg").unwrap();
        assert_eq!(path, PathBuf::from("/srv/shared/photo.jpg"));
    }

    #[test]
    fn test_resolve_allows_dotfiles() {
        let shared = SharedDir::new("/srv/shared");
        let path = shared.resolve(".hidden").unwrap();
        assert_eq!(path, PathBuf::from("/srv/shared/.hidden"));
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let shared = SharedDir::new("/srv/shared");

        for bad in [
            "",
            ".",
            "..",
            "../etc/passwd",
            "a/b",
            "a/../b",
            "/etc/passwd",
            "dir/",
            "a\\b",
        ] {
            let result = shared.resolve(bad);
            assert!(
                matches!(result, Err(StorageError::InvalidName { .. })),
                "expected {:?} to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_entries_lists_files_sorted() {
        let temp_dir = TempDir::new().unwrap();
        let shared = SharedDir::new(temp_dir.path());

        fs::write(temp_dir.path().join("zebra.txt"), b"zz").unwrap();
        fs::write(temp_dir.path().join("alpha.txt"), b"a").unwrap();
        fs::create_dir(temp_dir.path().join("subdir")).unwrap();

        let entries = shared.entries().unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha.txt", "zebra.txt"]);
        assert_eq!(entries[0].size, 1);
        assert_eq!(entries[1].size, 2);
        assert!(entries[0].modified.is_some());
    }

    #[test]
    fn test_entries_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let shared = SharedDir::new(temp_dir.path().join("gone"));

        let result = shared.entries();
        assert!(matches!(result, Err(StorageError::Io { .. })));
    }

    #[test]
    fn test_file_names() {
        let temp_dir = TempDir::new().unwrap();
        let shared = SharedDir::new(temp_dir.path());

        fs::write(temp_dir.path().join("b.bin"), b"").unwrap();
        fs::write(temp_dir.path().join("a.bin"), b"").unwrap();

        assert_eq!(shared.file_names().unwrap(), vec!["a.bin", "b.bin"]);
    }

    #[test]
    fn test_remove_deletes_file() {
        let temp_dir = TempDir::new().unwrap();
        let shared = SharedDir::new(temp_dir.path());

        let path = temp_dir.path().join("doomed.txt");
        fs::write(&path, b"bye").unwrap();

        shared.remove("doomed.txt").unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_remove_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let shared = SharedDir::new(temp_dir.path());

        let result = shared.remove("never-existed.txt");
        assert!(matches!(result, Err(StorageError::Io { .. })));
    }

    #[test]
    fn test_remove_rejects_bad_name() {
        let temp_dir = TempDir::new().unwrap();
        let shared = SharedDir::new(temp_dir.path());

        let result = shared.remove("../escape");
        assert!(matches!(result, Err(StorageError::InvalidName { .. })));
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(0), "0 B");
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(1024), "1.0 KiB");
        assert_eq!(human_size(1536), "1.5 KiB");
        assert_eq!(human_size(5 * 1024 * 1024), "5.0 MiB");
        assert_eq!(human_size(3 * 1024 * 1024 * 1024), "3.0 GiB");
    }
}
