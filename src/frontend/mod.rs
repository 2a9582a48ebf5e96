pub mod client_listener;
pub mod context;
pub mod session;
pub mod storage_listener;

use context::NamingContext;
use std::sync::Arc;

use crate::cluster::monitor;

pub async fn start_all() -> anyhow::Result<()> {
    let ctx = NamingContext::from_config();
    tokio::try_join!(
        client_listener::run_client_listener(Arc::clone(&ctx)),
        storage_listener::run_storage_listener(Arc::clone(&ctx)),
        monitor::run(Arc::clone(&ctx)),
    )?;
    Ok(())
}

#[cfg(test)]
mod storage_listener_tests;
