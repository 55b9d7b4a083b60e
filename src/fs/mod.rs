// src/fs/mod.rs

//! Filesystem access used by the launch builders.
//!
//! Launch validation only needs a handful of questions answered about the
//! workload directory, so they sit behind a trait that tests can replace
//! with [`mock::MockFileSystem`].

use std::fmt::Debug;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

pub mod mock;

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    fn exists(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;

    /// Succeeds if the file can be opened for reading right now.
    fn check_readable(&self, path: &Path) -> Result<()>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn check_readable(&self, path: &Path) -> Result<()> {
        fs::File::open(path).with_context(|| format!("opening file {:?}", path))?;
        Ok(())
    }
}
