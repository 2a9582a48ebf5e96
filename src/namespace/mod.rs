pub mod cache;
pub mod codec;
pub mod locks;
pub mod tree;

pub use cache::PathCache;
pub use locks::{LockMode, SubtreeGuard};
pub use tree::{NodeId, PathKind, PathTree};

#[cfg(test)]
mod tree_tests;
