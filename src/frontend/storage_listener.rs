use std::io;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::cluster::registry::ServerRecord;
use crate::frontend::context::NamingContext;
use crate::namespace::codec;
use crate::shared::config::CONFIG;
use crate::shared::wire::frames::{self, JoinRecord};
use crate::shared::wire::types::Status;

/// Accepts storage-server joins: each connection carries one join record,
/// gets acknowledged, and is closed.
pub async fn run_storage_listener(ctx: Arc<NamingContext>) -> anyhow::Result<()> {
    let addr = &CONFIG.server.storage_addr;
    let listener = TcpListener::bind(addr).await?;
    info!(target: "routefs::storage_listener", %addr, "listening for storage servers");

    loop {
        let (mut stream, peer) = listener.accept().await?;
        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move {
            if let Err(err) = handle_join(ctx, &mut stream).await {
                warn!(target: "routefs::storage_listener", %peer, %err, "join rejected");
            }
        });
    }
}

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

/// Admits one joining server: decode its identity and subtree, register
/// it, graft the subtree, acknowledge. Malformed input fails the join and
/// registers nothing.
pub async fn handle_join<S: AsyncRead + AsyncWrite + Unpin>(
    ctx: Arc<NamingContext>,
    stream: &mut S,
) -> io::Result<()> {
    let join = JoinRecord::read_from(stream, CONFIG.namespace.max_tree_bytes).await?;

    let nm_port = port_of(join.nm_port, "nm")?;
    let client_port = port_of(join.client_port, "client")?;
    let alive_port = port_of(join.alive_port, "alive")?;
    if join.uuid.is_empty() {
        return Err(invalid("join record carries no working-directory identity".into()));
    }

    let subtree = codec::decode(&join.tree)
        .map_err(|err| invalid(format!("announced subtree does not decode: {err}")))?;

    let record = ServerRecord::new(
        nm_port,
        client_port,
        alive_port,
        join.uuid,
        join.tree.len(),
    );
    info!(
        target: "routefs::storage_listener",
        id = record.id,
        client_port,
        alive_port,
        uuid = %record.uuid,
        tree_bytes = record.tree_bytes,
        "storage server joined"
    );
    ctx.admit_server(record, subtree);

    frames::write_status(stream, Status::Success).await
}

fn port_of(value: u32, which: &str) -> io::Result<u16> {
    u16::try_from(value).map_err(|_| invalid(format!("{which} port {value} is out of range")))
}
