use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

use crate::cluster::redundancy::TopLevelEntry;
use crate::cluster::registry::{ServerRecord, ServerRegistry};
use crate::namespace::cache::PathCache;
use crate::namespace::locks::{self, LockMode, SubtreeGuard};
use crate::namespace::tree::PathTree;
use crate::shared::config::CONFIG;
use crate::shared::path::{fallback_candidates, is_redundancy_path, normalize};

/// Shared naming-server state, constructed once and handed to every
/// connection handler. The tree mutex is the coarse structural lock: it
/// covers pointer surgery and cache mutation and is never held across an
/// await point. Per-node subtree locks are orthogonal to it.
pub struct NamingContext {
    pub tree: Mutex<PathTree>,
    pub cache: PathCache,
    pub registry: ServerRegistry,
}

impl NamingContext {
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            tree: Mutex::new(PathTree::new()),
            cache: PathCache::new(cache_capacity),
            registry: ServerRegistry::new(),
        }
    }

    pub fn from_config() -> Arc<Self> {
        Arc::new(Self::new(CONFIG.namespace.cache_capacity))
    }

    /// Cache-aware resolve. Hits are trusted, stale entries self-heal
    /// downstream. Misses consult the tree and fill the cache unless the
    /// path is a redundancy probe, which never has stable identity.
    pub fn resolve_owner(&self, path: &str) -> Option<u32> {
        let key = normalize(path);
        if key.is_empty() {
            return None;
        }
        if let Some(owner) = self.cache.get(&key) {
            debug!(target: "routefs::resolve", path = %key, owner, "cache hit");
            return Some(owner);
        }
        let owner = self.tree.lock().resolve(&key)?;
        if !is_redundancy_path(&key) {
            self.cache.put(&key, owner);
        }
        Some(owner)
    }

    /// Read-side resolve: the primary path first, then each replica
    /// location in order. Returns the path that actually resolved together
    /// with its owner.
    pub fn resolve_for_read(&self, path: &str) -> Option<(String, u32)> {
        if let Some(owner) = self.resolve_owner(path) {
            return Some((normalize(path), owner));
        }
        if is_redundancy_path(path) {
            return None;
        }
        for candidate in fallback_candidates(path) {
            if let Some(owner) = self.resolve_owner(&candidate) {
                debug!(
                    target: "routefs::resolve",
                    primary = path,
                    replica = %candidate,
                    "read served from a replica"
                );
                return Some((candidate, owner));
            }
        }
        None
    }

    /// Locks a path's subtree. The lock set is collected under the tree
    /// mutex; the guards themselves are acquired after it is released.
    pub async fn lock_subtree(&self, path: &str, mode: LockMode) -> SubtreeGuard {
        let lock_set = self.tree.lock().collect_subtree_locks(path);
        locks::acquire(lock_set, mode).await
    }

    /// Full server departure: the registry record, every owned subtree,
    /// and every cache entry pointing at it all go.
    pub fn drop_server(&self, id: u32) {
        let record = self.registry.remove(id);
        let removed = self.tree.lock().remove_server_paths(id);
        let purged = self.cache.remove_owner(id);
        debug!(
            target: "routefs::context",
            id,
            known = record.is_some(),
            subtrees = removed.len(),
            cache_entries = purged,
            "storage server dropped"
        );
    }

    /// Registers a joining server and grafts its announced subtree under
    /// the root. A re-join first prunes whatever the previous registration
    /// owned.
    pub fn admit_server(&self, record: ServerRecord, subtree: PathTree) {
        if self.registry.get(record.id).is_some() {
            self.drop_server(record.id);
        }
        let id = record.id;
        let uuid = record.uuid.clone();
        self.registry.add(record);

        let mut tree = self.tree.lock();
        tree.merge(&subtree, id, &uuid);
        debug!(target: "routefs::context", id, "subtree merged:\n{}", tree.render());
    }

    /// Snapshot of the accessible top-level entries, for replica planning.
    pub fn top_level_entries(&self) -> Vec<TopLevelEntry> {
        let tree = self.tree.lock();
        tree.children(tree.root())
            .map(|id| tree.node(id))
            .filter(|node| node.accessible)
            .map(|node| TopLevelEntry {
                name: node.name.clone(),
                is_file: node.is_file,
                owner_id: node.owner_id,
                owner_uuid: node.owner_uuid.clone(),
            })
            .collect()
    }
}
