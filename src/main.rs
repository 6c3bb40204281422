//! # MGK Timer Client
//!
//! Console client for the laser-gate timing device.
//!
//! This is the application entry point that initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - Connection manager and display loop

use anyhow::Result;
use tracing::info;

use mgk_timer_client::config::Settings;
use mgk_timer_client::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    mgk_timer_client::telemetry::init_tracing();

    info!("Starting timer client...");

    let settings = Settings::load()?;
    info!(
        url = %settings.device.url,
        heartbeat_ms = settings.heartbeat.interval_ms,
        environment = %settings.environment,
        "Configuration loaded"
    );

    let application = Application::build(settings);
    application.run_until_stopped().await?;

    info!("Timer client stopped");
    Ok(())
}
