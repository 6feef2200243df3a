use super::types::SchemaDefinition;
use crate::error::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Memo table of resolved schemas keyed by source path.
///
/// Owned by a single orchestrator; hand it from one run to the next to skip
/// re-reading and re-resolving unchanged schemas.
#[derive(Debug, Default)]
pub struct SchemaCache {
    entries: HashMap<PathBuf, Arc<SchemaDefinition>>,
    stats: CacheStats,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached schema for `path`, or run `load` and remember its result.
    /// Failed loads are not cached.
    pub fn get_or_load<F>(&mut self, path: &Path, load: F) -> Result<Arc<SchemaDefinition>>
    where
        F: FnOnce(&Path) -> Result<SchemaDefinition>,
    {
        if let Some(schema) = self.entries.get(path) {
            self.stats.hits += 1;
            log::debug!("Schema cache hit: {}", path.display());
            return Ok(Arc::clone(schema));
        }

        self.stats.misses += 1;
        log::debug!("Schema cache miss: {}", path.display());
        let schema = Arc::new(load(path)?);
        self.entries.insert(path.to_path_buf(), Arc::clone(&schema));
        Ok(schema)
    }

    pub fn get(&self, path: &Path) -> Option<Arc<SchemaDefinition>> {
        self.entries.get(path).cloned()
    }

    /// Drop one entry. Returns whether it was present.
    pub fn invalidate(&mut self, path: &Path) -> bool {
        self.entries.remove(path).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
