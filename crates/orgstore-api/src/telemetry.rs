//! Tracing subscriber initialization.

use orgstore_core::Config;
use tracing_subscriber::{
    fmt::format::Format, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "orgstore=debug,tower_http=debug";

/// Install the global subscriber: JSON lines in production, compact console output otherwise.
pub fn init_telemetry(config: &Config) -> Result<(), anyhow::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    if config.is_production() {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true),
            )
            .try_init()?;
    } else {
        let console_fmt = tracing_subscriber::fmt::layer().event_format(
            Format::default()
                .compact()
                .with_target(false)
                .without_time(),
        );
        registry.with(console_fmt).try_init()?;
    }

    tracing::info!(environment = %config.environment, "Tracing initialized");
    Ok(())
}
