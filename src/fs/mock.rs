// src/fs/mock.rs

use super::FileSystem;
use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File { readable: bool },
    Dir,
}

/// In-memory filesystem for launch-builder tests.
///
/// Adding a file implicitly creates all of its parent directories.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>) {
        self.insert_file(path.as_ref(), true);
    }

    /// Add a file that exists but fails the readability check.
    pub fn add_unreadable_file(&self, path: impl AsRef<Path>) {
        self.insert_file(path.as_ref(), false);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut entries = self.lock();
        for dir in path.as_ref().ancestors() {
            if dir.as_os_str().is_empty() {
                continue;
            }
            entries.entry(dir.to_path_buf()).or_insert(MockEntry::Dir);
        }
    }

    fn insert_file(&self, path: &Path, readable: bool) {
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }
        self.lock()
            .insert(path.to_path_buf(), MockEntry::File { readable });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, MockEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.lock().get(path), Some(MockEntry::File { .. }))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().get(path), Some(MockEntry::Dir))
    }

    fn check_readable(&self, path: &Path) -> Result<()> {
        match self.lock().get(path) {
            Some(MockEntry::File { readable: true }) => Ok(()),
            Some(MockEntry::File { readable: false }) => {
                Err(anyhow!("Permission denied: {:?}", path))
            }
            Some(MockEntry::Dir) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adding_a_file_creates_parent_dirs() {
        let fs = MockFileSystem::new();
        fs.add_file("/opt/miner/bin/xmrig");

        assert!(fs.is_dir(Path::new("/opt/miner/bin")));
        assert!(fs.is_dir(Path::new("/opt")));
        assert!(fs.is_file(Path::new("/opt/miner/bin/xmrig")));
        assert!(fs.check_readable(Path::new("/opt/miner/bin/xmrig")).is_ok());
    }

    #[test]
    fn unreadable_files_exist_but_fail_the_check() {
        let fs = MockFileSystem::new();
        fs.add_unreadable_file("/w/xmr-stak-rx");

        assert!(fs.exists(Path::new("/w/xmr-stak-rx")));
        assert!(fs.check_readable(Path::new("/w/xmr-stak-rx")).is_err());
        assert!(fs.check_readable(Path::new("/w")).is_err());
    }
}
