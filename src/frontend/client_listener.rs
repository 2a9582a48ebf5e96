use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::frontend::context::NamingContext;
use crate::frontend::session::ClientSession;
use crate::shared::config::CONFIG;

/// Accepts client connections, one session task per client.
pub async fn run_client_listener(ctx: Arc<NamingContext>) -> anyhow::Result<()> {
    let addr = &CONFIG.server.client_addr;
    let listener = TcpListener::bind(addr).await?;
    info!(target: "routefs::client_listener", %addr, "listening for clients");

    loop {
        let (stream, peer) = listener.accept().await?;
        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move {
            if let Err(err) = ClientSession::new(ctx, stream).run().await {
                warn!(target: "routefs::client_listener", %peer, %err, "session ended with a transport error");
            }
        });
    }
}
