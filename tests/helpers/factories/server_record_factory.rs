use crate::cluster::registry::ServerRecord;

/// A record whose id doubles as its nm port, with the sibling ports laid
/// out next to it the way a local test cluster would allocate them.
pub fn record(nm_port: u16, uuid: &str, tree_bytes: usize) -> ServerRecord {
    ServerRecord::new(nm_port, nm_port + 1, nm_port + 2, uuid.to_string(), tree_bytes)
}
