use std::sync::Arc;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

#[derive(Debug)]
enum HeldLock {
    Shared(OwnedRwLockReadGuard<()>),
    Exclusive(OwnedRwLockWriteGuard<()>),
}

/// Scope guard over an acquired subtree. Dropping it releases every node
/// lock, so an early return or panic inside the protected operation cannot
/// leave the subtree locked.
#[derive(Debug)]
pub struct SubtreeGuard {
    held: Vec<HeldLock>,
    mode: LockMode,
}

impl SubtreeGuard {
    pub fn mode(&self) -> LockMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    /// An empty guard means the path did not resolve when the locks were
    /// collected; holding it is a no-op.
    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}

/// Acquires every lock in the order given, which callers produce by
/// pre-order traversal. That fixed order is what keeps overlapping subtree
/// acquisitions cycle-free: an ancestor's holder reaches a descendant's
/// node only after the position the descendant's holder started from.
pub async fn acquire(locks: Vec<Arc<RwLock<()>>>, mode: LockMode) -> SubtreeGuard {
    let mut held = Vec::with_capacity(locks.len());
    for lock in locks {
        match mode {
            LockMode::Shared => held.push(HeldLock::Shared(lock.read_owned().await)),
            LockMode::Exclusive => held.push(HeldLock::Exclusive(lock.write_owned().await)),
        }
    }
    SubtreeGuard { held, mode }
}
