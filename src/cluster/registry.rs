use parking_lot::RwLock;

/// One currently connected storage server. The port it listens on for the
/// naming server doubles as its identity, which is also what every owned
/// tree node is stamped with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerRecord {
    pub id: u32,
    pub nm_port: u16,
    pub client_port: u16,
    pub alive_port: u16,
    /// Working-directory identity, distinguishing redundancy buckets.
    pub uuid: String,
    /// Byte length of the last subtree the server announced. Smallest wins
    /// when placing new top-level entries.
    pub tree_bytes: usize,
}

impl ServerRecord {
    pub fn new(
        nm_port: u16,
        client_port: u16,
        alive_port: u16,
        uuid: String,
        tree_bytes: usize,
    ) -> Self {
        Self {
            id: nm_port as u32,
            nm_port,
            client_port,
            alive_port,
            uuid,
            tree_bytes,
        }
    }
}

/// The list of connected storage servers, guarded independently of the
/// tree: membership changes and tree surgery are separate critical
/// sections even though join and leave events touch both.
#[derive(Debug, Default)]
pub struct ServerRegistry {
    inner: RwLock<Vec<ServerRecord>>,
}

impl ServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a server. A record with the same id is replaced and the
    /// previous record returned so the caller can prune what it owned.
    pub fn add(&self, record: ServerRecord) -> Option<ServerRecord> {
        let mut inner = self.inner.write();
        let previous = inner
            .iter()
            .position(|existing| existing.id == record.id)
            .map(|index| inner.remove(index));
        inner.push(record);
        previous
    }

    pub fn remove(&self, id: u32) -> Option<ServerRecord> {
        let mut inner = self.inner.write();
        let index = inner.iter().position(|record| record.id == id)?;
        Some(inner.remove(index))
    }

    pub fn get(&self, id: u32) -> Option<ServerRecord> {
        self.inner.read().iter().find(|record| record.id == id).cloned()
    }

    /// The server with the smallest announced subtree, used to place new
    /// top-level entries.
    pub fn least_loaded(&self) -> Option<ServerRecord> {
        self.inner
            .read()
            .iter()
            .min_by_key(|record| record.tree_bytes)
            .cloned()
    }

    /// Snapshot in registration order.
    pub fn all(&self) -> Vec<ServerRecord> {
        self.inner.read().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
