use super::{Lister, Reader, Writer, DOCUMENT_GLOB};
use crate::error::{FrontschemaError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// An in-memory file tree implementing the reader, writer, and lister
/// collaborators. Clones share the same files, so a test can hand one clone
/// to the pipeline and inspect written output through another.
#[derive(Debug, Default, Clone)]
pub struct MemoryFs {
    files: Arc<Mutex<BTreeMap<PathBuf, String>>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.lock().insert(path.into(), content.into());
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<String> {
        self.lock().get(path.as_ref()).cloned()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<PathBuf, String>> {
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Reader for MemoryFs {
    fn read(&self, path: &Path) -> Result<String> {
        self.get(path)
            .ok_or_else(|| FrontschemaError::FileNotFound(path.to_path_buf()))
    }
}

impl Writer for MemoryFs {
    fn write(&self, path: &Path, content: &str) -> Result<()> {
        self.insert(path, content);
        Ok(())
    }
}

impl Lister for MemoryFs {
    fn list(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let files = self.lock();
        let dir = Path::new(pattern);
        let is_dir = files.keys().any(|p| p != dir && p.starts_with(dir));

        let pattern = if is_dir {
            format!("{}/{}", pattern.trim_end_matches('/'), DOCUMENT_GLOB)
        } else {
            pattern.to_string()
        };

        let matcher = glob::Pattern::new(&pattern).map_err(|e| {
            FrontschemaError::InvalidFormat(format!("Invalid glob pattern '{pattern}': {e}"))
        })?;

        let options = glob::MatchOptions {
            require_literal_separator: true,
            ..Default::default()
        };

        Ok(files
            .keys()
            .filter(|p| matcher.matches_path_with(p, options))
            .cloned()
            .collect())
    }
}
