use routefs::frontend::start_all;
use routefs::logging;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init()?;

    info!("routefs naming server starting");
    start_all().await?;

    Ok(())
}
