// src/workdir.rs

//! Working directory for rewritten bundles

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tracing::debug;

/// Directory that receives intermediate files of one packaging run
///
/// Each call to [`WorkingDir::allocate`] hands out a path in its own
/// subdirectory, so concurrent bundle transformations sharing one
/// `WorkingDir` never write to the same file.
#[derive(Debug)]
pub struct WorkingDir {
    root: PathBuf,
    next: AtomicUsize,
    // Removed on drop when the directory was created by `temporary()`
    _temp: Option<TempDir>,
}

impl WorkingDir {
    /// Use (and create if needed) a directory at `path`
    pub fn new(path: impl Into<PathBuf>) -> io::Result<Self> {
        let root = path.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            next: AtomicUsize::new(0),
            _temp: None,
        })
    }

    /// Create a fresh directory under the system temp dir, deleted on drop
    pub fn temporary() -> io::Result<Self> {
        let temp = tempfile::Builder::new().prefix("deploypack-").tempdir()?;
        Ok(Self {
            root: temp.path().to_path_buf(),
            next: AtomicUsize::new(0),
            _temp: Some(temp),
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Reserve a unique path ending in `file_name`
    pub fn allocate(&self, file_name: &str) -> io::Result<PathBuf> {
        let slot = self.next.fetch_add(1, Ordering::Relaxed);
        let dir = self.root.join(format!("bundle-{:04}", slot));
        fs::create_dir_all(&dir)?;
        let path = dir.join(file_name);
        debug!("Allocated working file {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_is_unique() {
        let workdir = WorkingDir::temporary().unwrap();
        let a = workdir.allocate("core.jar").unwrap();
        let b = workdir.allocate("core.jar").unwrap();
        assert_ne!(a, b);
        assert_eq!(a.file_name().unwrap(), "core.jar");
        assert!(a.parent().unwrap().is_dir());
        assert!(a.starts_with(workdir.path()));
    }

    #[test]
    fn test_temporary_removed_on_drop() {
        let workdir = WorkingDir::temporary().unwrap();
        let root = workdir.path().to_path_buf();
        assert!(root.is_dir());
        drop(workdir);
        assert!(!root.exists());
    }

    #[test]
    fn test_new_creates_and_keeps_directory() {
        let parent = TempDir::new().unwrap();
        let root = parent.path().join("nested/work");
        let workdir = WorkingDir::new(&root).unwrap();
        assert!(root.is_dir());
        drop(workdir);
        assert!(root.is_dir());
    }
}
