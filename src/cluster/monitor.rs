use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::cluster::redundancy;
use crate::cluster::registry::ServerRecord;
use crate::frontend::context::NamingContext;
use crate::shared::config::CONFIG;

/// Background loop that probes every registered storage server between
/// sleeps, prunes the ones that stopped answering, and then lets the
/// redundancy sweep catch replicas up.
pub async fn run(ctx: Arc<NamingContext>) -> anyhow::Result<()> {
    let interval = Duration::from_secs(CONFIG.monitor.sweep_interval_secs);
    info!(
        target: "routefs::monitor",
        interval_secs = CONFIG.monitor.sweep_interval_secs,
        "liveness monitor running"
    );

    loop {
        tokio::time::sleep(interval).await;
        sweep(&ctx).await;
        if CONFIG.redundancy.enabled {
            redundancy::sync_replicas(&ctx).await;
        }
    }
}

pub async fn sweep(ctx: &NamingContext) {
    for record in ctx.registry.all() {
        if probe(&record).await {
            debug!(target: "routefs::monitor", id = record.id, "storage server is alive");
        } else {
            warn!(
                target: "routefs::monitor",
                id = record.id,
                "storage server stopped answering, pruning its subtree"
            );
            ctx.drop_server(record.id);
        }
    }
}

async fn probe(record: &ServerRecord) -> bool {
    let timeout = Duration::from_millis(CONFIG.monitor.probe_timeout_ms);
    let attempt = TcpStream::connect((CONFIG.server.storage_host.as_str(), record.alive_port));
    matches!(tokio::time::timeout(timeout, attempt).await, Ok(Ok(_)))
}
