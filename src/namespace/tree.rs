use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::shared::path::segments;

/// Stable handle into the tree arena. Handles stay valid until the node is
/// removed; slots are recycled through a free list afterwards.
pub type NodeId = u32;

/// Name carried by every tree root.
pub const ROOT_NAME: &str = ".";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    File,
    Directory,
    NotFound,
}

/// One path segment in the namespace index.
#[derive(Debug)]
pub struct PathNode {
    pub name: String,
    pub is_file: bool,
    /// False marks a synthetic ancestor that exists only to route to real
    /// accessible nodes underneath it.
    pub accessible: bool,
    /// Storage server responsible for serving this path's content.
    pub owner_id: u32,
    /// Working-directory identity of the owning server, used to tell
    /// redundancy buckets apart.
    pub owner_uuid: String,
    pub child_count: u32,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    next_sibling: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    lock: Arc<RwLock<()>>,
}

impl PathNode {
    fn new(name: &str, is_file: bool, accessible: bool, owner_id: u32, owner_uuid: &str) -> Self {
        Self {
            name: name.to_string(),
            is_file,
            accessible,
            owner_id,
            owner_uuid: owner_uuid.to_string(),
            child_count: 0,
            parent: None,
            first_child: None,
            next_sibling: None,
            prev_sibling: None,
            lock: Arc::new(RwLock::new(())),
        }
    }
}

/// Arena-backed namespace index mapping hierarchical paths to the storage
/// servers that hold them. Structural mutation is synchronized externally
/// by the owner of the tree; per-node locks cover the logical read/write
/// protocol and are handed out through [`PathTree::collect_subtree_locks`].
#[derive(Debug)]
pub struct PathTree {
    slots: Vec<Option<PathNode>>,
    free: Vec<NodeId>,
    root: NodeId,
}

impl Default for PathTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PathTree {
    pub fn new() -> Self {
        let root = PathNode::new(ROOT_NAME, false, false, 0, "");
        Self {
            slots: vec![Some(root)],
            free: Vec::new(),
            root: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &PathNode {
        self.slots[id as usize].as_ref().expect("live tree node")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut PathNode {
        self.slots[id as usize].as_mut().expect("live tree node")
    }

    /// Number of live nodes, the root included.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        // The root always exists; an "empty" tree is a lone root.
        self.len() <= 1
    }

    pub fn lock_handle(&self, id: NodeId) -> Arc<RwLock<()>> {
        Arc::clone(&self.node(id).lock)
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.node(id).first_child, move |&child| {
            self.node(child).next_sibling
        })
    }

    pub fn find_child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent).find(|&child| self.node(child).name == name)
    }

    fn alloc(&mut self, node: PathNode) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.slots[id as usize] = Some(node);
                id
            }
            None => {
                self.slots.push(Some(node));
                (self.slots.len() - 1) as NodeId
            }
        }
    }

    /// Appends a new child at the tail of `parent`'s sibling list and
    /// returns its handle. Sibling name uniqueness is the caller's business.
    pub fn attach_child_with(
        &mut self,
        parent: NodeId,
        name: &str,
        is_file: bool,
        accessible: bool,
        owner_id: u32,
        owner_uuid: &str,
    ) -> NodeId {
        let mut node = PathNode::new(name, is_file, accessible, owner_id, owner_uuid);
        node.parent = Some(parent);
        let id = self.alloc(node);

        let tail = self.children(parent).last();
        match tail {
            Some(tail) => {
                self.node_mut(tail).next_sibling = Some(id);
                self.node_mut(id).prev_sibling = Some(tail);
            }
            None => {
                self.node_mut(parent).first_child = Some(id);
            }
        }
        self.node_mut(parent).child_count += 1;
        id
    }

    /// Rewrites a node's metadata in place. Used when a decoded record lands
    /// on an already-allocated node, and by idempotent re-adds.
    pub fn set_meta(
        &mut self,
        id: NodeId,
        name: &str,
        is_file: bool,
        accessible: bool,
        owner_id: u32,
        owner_uuid: &str,
    ) {
        let node = self.node_mut(id);
        node.name = name.to_string();
        node.is_file = is_file;
        node.accessible = accessible;
        node.owner_id = owner_id;
        node.owner_uuid = owner_uuid.to_string();
    }

    /// Walks the path from the root. Inaccessible nodes are valid waypoints,
    /// so this finds them too; `resolve` applies the accessibility rule.
    /// The empty path does not address anything, the root included.
    pub fn lookup(&self, path: &str) -> Option<NodeId> {
        let mut current = self.root;
        let mut walked = false;
        for segment in segments(path) {
            walked = true;
            current = self.find_child(current, segment)?;
        }
        if walked { Some(current) } else { None }
    }

    /// Maps a path to its owning server id. Fails when any segment is
    /// missing or when the terminal node is only a routing waypoint.
    pub fn resolve(&self, path: &str) -> Option<u32> {
        let id = self.lookup(path)?;
        let node = self.node(id);
        if !node.accessible {
            return None;
        }
        Some(node.owner_id)
    }

    pub fn kind(&self, path: &str) -> PathKind {
        match self.lookup(path) {
            Some(id) => {
                let node = self.node(id);
                if !node.accessible {
                    PathKind::NotFound
                } else if node.is_file {
                    PathKind::File
                } else {
                    PathKind::Directory
                }
            }
            None => PathKind::NotFound,
        }
    }

    /// Registers a path, creating missing ancestors as inaccessible
    /// placeholders stamped with the same owner. Re-adding an existing
    /// terminal updates its flags and owner in place.
    ///
    /// Fails when the path is empty, when a non-terminal segment is an
    /// existing file, or when a file flag is requested for a node that
    /// still has children.
    pub fn add_path(
        &mut self,
        path: &str,
        is_file: bool,
        owner_id: u32,
        owner_uuid: &str,
    ) -> Option<NodeId> {
        let segs: Vec<&str> = segments(path).collect();
        if segs.is_empty() {
            return None;
        }

        let mut current = self.root;
        let last = segs.len() - 1;
        for (index, segment) in segs.iter().enumerate() {
            current = match self.find_child(current, segment) {
                Some(child) => {
                    if index < last && self.node(child).is_file {
                        return None;
                    }
                    child
                }
                None => self.attach_child_with(current, segment, false, false, owner_id, owner_uuid),
            };
        }

        if is_file && self.node(current).first_child.is_some() {
            return None;
        }

        let node = self.node_mut(current);
        node.is_file = is_file;
        node.accessible = true;
        node.owner_id = owner_id;
        node.owner_uuid = owner_uuid.to_string();
        Some(current)
    }

    /// Removes a path and its entire subtree. Missing paths are a no-op,
    /// tolerating callers acting on a stale resolve.
    pub fn delete_path(&mut self, path: &str) -> bool {
        match self.lookup(path) {
            Some(id) => {
                self.delete_node(id);
                true
            }
            None => false,
        }
    }

    fn delete_node(&mut self, id: NodeId) {
        self.unlink(id);
        self.free_subtree(id);
    }

    fn unlink(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let node = self.node(id);
            (node.parent, node.prev_sibling, node.next_sibling)
        };
        if let Some(parent) = parent {
            let parent_node = self.node_mut(parent);
            parent_node.child_count -= 1;
            if parent_node.first_child == Some(id) {
                parent_node.first_child = next;
            }
        }
        if let Some(prev) = prev {
            self.node_mut(prev).next_sibling = next;
        }
        if let Some(next) = next {
            self.node_mut(next).prev_sibling = prev;
        }
    }

    fn free_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let children: Vec<NodeId> = self.children(current).collect();
            stack.extend(children);
            self.slots[current as usize] = None;
            self.free.push(current);
        }
    }

    /// Grafts every direct child of `incoming`'s root under this tree's
    /// root, stamping the joining server's identity on each grafted child.
    /// Deeper descendants keep the ownership baked into the incoming
    /// subtree by its serialized records.
    pub fn merge(&mut self, incoming: &PathTree, owner_id: u32, owner_uuid: &str) {
        let root = self.root;
        let tops: Vec<NodeId> = incoming.children(incoming.root).collect();
        for top in tops {
            let meta = incoming.node(top);
            let grafted = self.attach_child_with(
                root,
                &meta.name,
                meta.is_file,
                meta.accessible,
                owner_id,
                owner_uuid,
            );

            let mut queue: VecDeque<(NodeId, NodeId)> =
                incoming.children(top).map(|child| (child, grafted)).collect();
            while let Some((source, target_parent)) = queue.pop_front() {
                let node = incoming.node(source);
                let copy = self.attach_child_with(
                    target_parent,
                    &node.name,
                    node.is_file,
                    node.accessible,
                    node.owner_id,
                    &node.owner_uuid,
                );
                for child in incoming.children(source) {
                    queue.push_back((child, copy));
                }
            }
        }
    }

    /// Unlinks and deep-deletes every direct child of the root owned by
    /// `owner_id`. Returns the names of the removed top-level entries.
    pub fn remove_server_paths(&mut self, owner_id: u32) -> Vec<String> {
        let doomed: Vec<NodeId> = self
            .children(self.root)
            .filter(|&child| self.node(child).owner_id == owner_id)
            .collect();

        let mut removed = Vec::with_capacity(doomed.len());
        for id in doomed {
            removed.push(self.node(id).name.clone());
            self.delete_node(id);
        }
        removed
    }

    /// True when `from`'s node lies on the parent chain of `to`'s node.
    /// A path is its own ancestor. Either path failing to look up means no
    /// ancestry relation exists.
    pub fn is_ancestor(&self, from: &str, to: &str) -> bool {
        let (Some(from_id), Some(to_id)) = (self.lookup(from), self.lookup(to)) else {
            return false;
        };
        let mut current = Some(to_id);
        while let Some(id) = current {
            if id == from_id {
                return true;
            }
            current = self.node(id).parent;
        }
        false
    }

    /// Mirrors the subtree at `src` under a fresh `dst`, stamping the given
    /// owner on every copied node. Used after a remote copy succeeds so the
    /// index reflects the new replica. Fails when `src` is missing or `dst`
    /// already exists.
    pub fn clone_subtree(
        &mut self,
        src: &str,
        dst: &str,
        owner_id: u32,
        owner_uuid: &str,
    ) -> bool {
        let Some(src_id) = self.lookup(src) else {
            return false;
        };
        if self.lookup(dst).is_some() {
            return false;
        }
        let src_is_file = self.node(src_id).is_file;
        let Some(dst_id) = self.add_path(dst, src_is_file, owner_id, owner_uuid) else {
            return false;
        };

        let mut queue: VecDeque<(NodeId, NodeId)> =
            self.children(src_id).map(|child| (child, dst_id)).collect();
        while let Some((source, target_parent)) = queue.pop_front() {
            let (name, is_file, accessible) = {
                let node = self.node(source);
                (node.name.clone(), node.is_file, node.accessible)
            };
            let copy = self.attach_child_with(
                target_parent,
                &name,
                is_file,
                accessible,
                owner_id,
                owner_uuid,
            );
            let children: Vec<NodeId> = self.children(source).collect();
            for child in children {
                queue.push_back((child, copy));
            }
        }
        true
    }

    /// Collects the lock of the path's node and of every descendant in
    /// pre-order (self, then children left to right, depth first). An
    /// unresolvable path yields an empty set, so locking a stale path is a
    /// harmless no-op.
    pub fn collect_subtree_locks(&self, path: &str) -> Vec<Arc<RwLock<()>>> {
        match self.lookup(path) {
            Some(id) => self.collect_locks_from(id),
            None => Vec::new(),
        }
    }

    pub fn collect_locks_from(&self, start: NodeId) -> Vec<Arc<RwLock<()>>> {
        let mut locks = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            locks.push(self.lock_handle(id));
            let mut children: Vec<NodeId> = self.children(id).collect();
            children.reverse();
            stack.extend(children);
        }
        locks
    }

    /// Indented listing of the whole tree, one node per line. Folders carry
    /// a trailing slash, waypoints are marked as such.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![(self.root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let node = self.node(id);
            for _ in 0..depth {
                out.push('\t');
            }
            out.push_str(&node.name);
            if !node.is_file {
                out.push('/');
            }
            if !node.accessible {
                out.push_str(" (waypoint)");
            }
            out.push('\n');

            let mut children: Vec<NodeId> = self.children(id).collect();
            children.reverse();
            for child in children {
                stack.push((child, depth + 1));
            }
        }
        out
    }
}
