//! File store backed by a mounted directory.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::error::AssemblyError;
use super::traits::FileStore;
use super::types::ListedFile;

/// Reads profiles deposited under `root/<directory>`.
/// The locator of a listed file is its full path.
pub struct LocalDirectoryStore {
    root: PathBuf,
}

impl LocalDirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileStore for LocalDirectoryStore {
    /// Regular files only, most recently modified first.
    fn list(&self, directory: &str) -> Result<Vec<ListedFile>, AssemblyError> {
        let dir = self.root.join(directory);
        let store_error = |reason: String| AssemblyError::FileStore {
            filename: dir.display().to_string(),
            reason,
        };

        let mut files: Vec<(Option<SystemTime>, ListedFile)> = Vec::new();
        for entry in std::fs::read_dir(&dir).map_err(|e| store_error(e.to_string()))? {
            let entry = entry.map_err(|e| store_error(e.to_string()))?;
            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(path = %entry.path().display(), error = %e, "Cannot stat file");
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(String::from) else {
                tracing::warn!(path = %entry.path().display(), "Skipping non UTF-8 filename");
                continue;
            };
            let locator = entry.path().display().to_string();
            files.push((metadata.modified().ok(), ListedFile::new(name, locator)));
        }

        files.sort_by(|(a_time, a), (b_time, b)| {
            b_time.cmp(a_time).then_with(|| a.name.cmp(&b.name))
        });

        tracing::debug!(directory = %dir.display(), count = files.len(), "Listed file store");
        Ok(files.into_iter().map(|(_, file)| file).collect())
    }

    fn fetch(&self, filename: &str, locator: &str) -> Result<Vec<u8>, AssemblyError> {
        std::fs::read(locator).map_err(|e| AssemblyError::FileStore {
            filename: filename.to_string(),
            reason: e.to_string(),
        })
    }
}
