//! Process-wide vocabulary cache.
//!
//! Vocabularies are large and immutable, so each `(path, flavor)` pair is
//! read from disk once and shared as an `Arc<Vocabulary>`. Loads are
//! serialized: the first caller performs the I/O while later callers wait
//! on the lock and receive the cached value. Failed loads are not cached.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use tracing::debug;

use ir2vec_types::Flavor;

use crate::error::VocabularyLoadError;
use crate::store::{Vocabulary, VocabularySource};

type CacheKey = (PathBuf, Flavor);

/// Cache of loaded vocabularies.
#[derive(Debug, Default)]
pub struct VocabularyRegistry {
    cache: Mutex<HashMap<CacheKey, Arc<Vocabulary>>>,
    loads: AtomicUsize,
}

impl VocabularyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry shared by the whole process.
    pub fn global() -> &'static VocabularyRegistry {
        static GLOBAL: OnceLock<VocabularyRegistry> = OnceLock::new();
        GLOBAL.get_or_init(VocabularyRegistry::new)
    }

    /// Return the cached vocabulary for `path`, loading it on first use.
    ///
    /// Existing paths are keyed by their canonical form, so `./v.json` and
    /// `v.json` share one entry.
    pub fn get_or_load(
        &self,
        path: &Path,
        flavor: Flavor,
    ) -> Result<Arc<Vocabulary>, VocabularyLoadError> {
        let key_path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let mut cache = self.lock();
        let key = (key_path, flavor);
        if let Some(vocab) = cache.get(&key) {
            debug!(path = ?path, %flavor, "Using cached vocabulary");
            return Ok(Arc::clone(vocab));
        }

        self.loads.fetch_add(1, Ordering::SeqCst);
        let vocab = Arc::new(Vocabulary::from_path(path, flavor)?);
        cache.insert(key, Arc::clone(&vocab));
        Ok(vocab)
    }

    /// Load any source. File sources go through the cache; in-memory
    /// sources are loaded fresh each time.
    pub fn load_source(
        &self,
        source: &VocabularySource,
        flavor: Flavor,
    ) -> Result<Arc<Vocabulary>, VocabularyLoadError> {
        match source {
            VocabularySource::Path(path) => self.get_or_load(path, flavor),
            other => Ok(Arc::new(Vocabulary::load(other, flavor)?)),
        }
    }

    /// Number of file loads performed (cache misses that reached the disk).
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Number of cached vocabularies.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached vocabulary. Engines holding an `Arc` keep theirs.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, Arc<Vocabulary>>> {
        // The map is only mutated by single inserts, so a poisoned guard
        // still holds consistent data.
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
