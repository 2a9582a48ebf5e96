use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

/// Bounded LRU over resolved paths. Entries are invalidated explicitly on
/// structural change or server departure, never by age. A stale entry is
/// self-healing downstream, so the cache stays advisory: the tree remains
/// the authority on every path it reports.
#[derive(Debug)]
pub struct PathCache {
    inner: Mutex<LruCache<String, u32>>,
}

impl PathCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity is at least one");
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// A hit promotes the entry to most recently used.
    pub fn get(&self, path: &str) -> Option<u32> {
        self.inner.lock().get(path).copied()
    }

    pub fn put(&self, path: &str, owner_id: u32) {
        self.inner.lock().put(path.to_string(), owner_id);
    }

    pub fn remove(&self, path: &str) -> bool {
        self.inner.lock().pop(path).is_some()
    }

    /// Evicts the entry for `prefix` and every entry nested under it.
    pub fn remove_prefix(&self, prefix: &str) -> usize {
        let mut inner = self.inner.lock();
        let nested = format!("{prefix}/");
        let doomed: Vec<String> = inner
            .iter()
            .filter(|(path, _)| path.as_str() == prefix || path.starts_with(&nested))
            .map(|(path, _)| path.clone())
            .collect();
        for path in &doomed {
            inner.pop(path);
        }
        doomed.len()
    }

    /// Purges every entry pointing at the given server.
    pub fn remove_owner(&self, owner_id: u32) -> usize {
        let mut inner = self.inner.lock();
        let doomed: Vec<String> = inner
            .iter()
            .filter(|&(_, &owner)| owner == owner_id)
            .map(|(path, _)| path.clone())
            .collect();
        for path in &doomed {
            inner.pop(path);
        }
        doomed.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
