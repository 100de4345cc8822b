//! Zero Screener - listing screener service for the Zero ecosystem.
//!
//! Serves sector filters, numerology date matching and index bar metrics
//! over HTTP.

use anyhow::Result;
use zero_common::config::Config;
use zero_common::logging::init_logging_with_exclusions;
use zero_screener::ScreenerService;

#[tokio::main]
async fn main() -> Result<()> {
    let startup_start = std::time::Instant::now();

    // Load and validate configuration
    let config = Config::load_and_validate()?;

    // Initialize logging
    init_logging_with_exclusions(
        &config.observability.log_level,
        &config.observability.log_format,
        &config.observability.exclude_targets,
    );

    tracing::info!("Zero Screener v{}", env!("CARGO_PKG_VERSION"));

    // Load tables and build the service
    let service = ScreenerService::new(config)?;

    let startup_duration = startup_start.elapsed();
    tracing::info!(
        duration_ms = startup_duration.as_millis() as u64,
        "Service initialized in {:?}",
        startup_duration
    );

    service.start().await
}
