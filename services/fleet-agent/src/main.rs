//! Fleet Agent
//!
//! Tracks which registered fleet owns each compute instance:
//! - Registers the fleets named in FLEETD_FLEETS
//! - Rebuilds the membership cache at startup and then on a fixed interval
//! - Logs the size of every fleet at startup

use std::sync::Arc;

use anyhow::Result;
use fleetd_agent::{Agent, Config, HttpFleetApi};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize tracing (prefer RUST_LOG, fallback to FLEETD_LOG_LEVEL)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting fleet agent");
    info!(
        api_url = %config.api_url,
        subscription_id = %config.subscription_id,
        resource_group = %config.resource_group,
        fleet_count = config.fleets.len(),
        refresh_interval_secs = config.refresh_interval.as_secs(),
        "Configuration loaded"
    );

    let api = Arc::new(HttpFleetApi::new(&config)?);
    let agent = Agent::start(&config, api).await;
    agent.report_sizes().await;

    agent.run_until(tokio::signal::ctrl_c()).await;
    Ok(())
}
