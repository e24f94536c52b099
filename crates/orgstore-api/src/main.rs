use orgstore_api::{setup, telemetry};
use orgstore_core::Config;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    telemetry::init_telemetry(&config)?;

    // Cancelled on shutdown so pending storage retries stop waiting
    let cancel = CancellationToken::new();

    let (_state, router) = setup::initialize_app(config.clone(), cancel.clone()).await?;

    setup::server::start_server(&config, router, cancel).await?;

    Ok(())
}
