//! Process-wide directory cache
//!
//! Maps archive paths to shared TOCs. The cache is never evicted and
//! never invalidated by on-disk changes; archives are assumed
//! immutable for the process lifetime. Only the map itself is
//! guarded — published TOCs are immutable and safe to share freely.
//! Two callers racing on an uncached path may both build; the builds
//! are content-identical, so the duplicate work is wasted but not
//! unsafe.

use crate::error::ImportError;
use crate::toc::Toc;
use once_cell::sync::Lazy;
use packimport_codec::ArchiveExtractor;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Cache of archive path → TOC.
///
/// Injectable for test isolation; production use normally goes
/// through [`global_cache`].
#[derive(Debug, Default)]
pub struct DirectoryCache {
    inner: Mutex<HashMap<String, Arc<Toc>>>,
}

impl DirectoryCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<Toc>>> {
        // a panic while holding the lock leaves the map structurally
        // intact, so a poisoned guard is still usable
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Return the cached TOC for `archive`, building it on miss.
    ///
    /// The TOC is read outside the lock; concurrent builders for the
    /// same path insert equivalent values.
    pub fn get_or_build(
        &self,
        archive: &str,
        extractor: &dyn ArchiveExtractor,
    ) -> Result<Arc<Toc>, ImportError> {
        if let Some(toc) = self.lock().get(archive) {
            return Ok(Arc::clone(toc));
        }

        let toc = Arc::new(Toc::read(extractor, archive)?);
        self.lock()
            .insert(archive.to_string(), Arc::clone(&toc));
        Ok(toc)
    }

    /// Whether a TOC for `archive` has been published.
    pub fn contains(&self, archive: &str) -> bool {
        self.lock().contains_key(archive)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Read-only view of the cache contents, for tests and debugging.
    pub fn snapshot(&self) -> Vec<(String, Arc<Toc>)> {
        let mut entries: Vec<_> = self
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), Arc::clone(v)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

// Process-global cache instance, initialized empty, never torn down.
static GLOBAL_CACHE: Lazy<Arc<DirectoryCache>> = Lazy::new(|| Arc::new(DirectoryCache::new()));

/// The process-wide directory cache shared by all importers that do
/// not inject their own.
pub fn global_cache() -> Arc<DirectoryCache> {
    Arc::clone(&GLOBAL_CACHE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use packimport_codec::MemoryExtractor;

    fn codec() -> MemoryExtractor {
        MemoryExtractor::with_archive(
            "/mem/lib.pack",
            [("a.mod", b"x = 1\n".to_vec()), ("pkg/", Vec::new())],
        )
    }

    #[test]
    fn test_builds_on_miss() {
        let cache = DirectoryCache::new();
        let codec = codec();
        assert!(cache.is_empty());

        let toc = cache.get_or_build("/mem/lib.pack", &codec).unwrap();
        assert_eq!(toc.len(), 2);
        assert!(cache.contains("/mem/lib.pack"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_reuses_on_hit() {
        let cache = DirectoryCache::new();
        let codec = codec();

        let first = cache.get_or_build("/mem/lib.pack", &codec).unwrap();
        let second = cache.get_or_build("/mem/lib.pack", &codec).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_or_build_is_idempotent() {
        let cache = DirectoryCache::new();
        let codec = codec();

        let first = cache.get_or_build("/mem/lib.pack", &codec).unwrap();
        let second = cache.get_or_build("/mem/lib.pack", &codec).unwrap();

        let mut keys_a: Vec<_> = first.iter().map(|(k, e)| (k.to_string(), e.size)).collect();
        let mut keys_b: Vec<_> = second.iter().map(|(k, e)| (k.to_string(), e.size)).collect();
        keys_a.sort();
        keys_b.sort();
        assert_eq!(keys_a, keys_b);
    }

    #[test]
    fn test_failed_build_not_cached() {
        let cache = DirectoryCache::new();
        let codec = MemoryExtractor::new();

        assert!(cache.get_or_build("/mem/none.pack", &codec).is_err());
        assert!(!cache.contains("/mem/none.pack"));
    }

    #[test]
    fn test_snapshot() {
        let cache = DirectoryCache::new();
        let codec = codec();
        cache.get_or_build("/mem/lib.pack", &codec).unwrap();

        let snapshot = cache.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].0, "/mem/lib.pack");
        assert_eq!(snapshot[0].1.len(), 2);
    }

    #[test]
    fn test_concurrent_builds_agree() {
        use std::thread;

        let cache = Arc::new(DirectoryCache::new());
        let codec = Arc::new(codec());

        let mut handles = vec![];
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let codec = Arc::clone(&codec);
            handles.push(thread::spawn(move || {
                let toc = cache.get_or_build("/mem/lib.pack", codec.as_ref()).unwrap();
                assert_eq!(toc.len(), 2);
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_global_cache_is_shared() {
        let a = global_cache();
        let b = global_cache();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
