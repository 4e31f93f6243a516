//! Directory catalog
//!
//! Enumerates the regular files of the served directory. The result is a
//! snapshot: a file listed here may be gone by the time it is opened.

use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use crate::error::DirectoryError;

/// Regular files of one directory, in the order the OS yields them
#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    root: PathBuf,
}

impl DirectoryCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub async fn list_regular_files(&self) -> Result<Vec<String>, DirectoryError> {
        list_regular_files(&self.root).await
    }

    /// Looks `name` up by exact, case-sensitive comparison against a fresh
    /// enumeration and returns the path to open on a match.
    pub async fn find(&self, name: &str) -> Result<Option<PathBuf>, DirectoryError> {
        let entries = self.list_regular_files().await?;
        Ok(entries
            .iter()
            .any(|entry| entry == name)
            .then(|| self.root.join(name)))
    }
}

/// Lists regular files in `path`.
///
/// Subdirectories, symlinks (even to regular files) and special files are
/// skipped, as are names that are not valid UTF-8. Hidden files are included.
pub async fn list_regular_files(path: &Path) -> Result<Vec<String>, DirectoryError> {
    let mut dir = tokio::fs::read_dir(path)
        .await
        .map_err(|e| DirectoryError::Open(path.to_path_buf(), e))?;

    let mut names = Vec::new();
    while let Some(entry) = dir
        .next_entry()
        .await
        .map_err(|e| DirectoryError::Read(path.to_path_buf(), e))?
    {
        // file_type() does not follow symlinks
        let file_type = match entry.file_type().await {
            Ok(ft) => ft,
            Err(e) => {
                warn!("Skipping {:?}: cannot stat entry: {}", entry.file_name(), e);
                continue;
            }
        };
        if !file_type.is_file() {
            continue;
        }

        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => debug!("Skipping non UTF-8 file name {:?}", raw),
        }
    }

    info!("Listed {} ({} regular files)", path.display(), names.len());
    Ok(names)
}
