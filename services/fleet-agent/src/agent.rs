//! Agent startup: register fleets, start the refresh loop, report sizes.

use std::future::Future;
use std::io;
use std::sync::Arc;

use fleetd_membership::{FleetApi, FleetManager, ManagerConfig};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::Config;

/// A running agent.
pub struct Agent {
    manager: Arc<FleetManager>,
    refresh: JoinHandle<()>,
}

impl Agent {
    /// Register the configured fleets and spawn the scheduled refresh loop.
    pub async fn start(config: &Config, api: Arc<dyn FleetApi>) -> Self {
        let manager = Arc::new(FleetManager::new(
            api,
            ManagerConfig {
                refresh_interval: config.refresh_interval,
            },
        ));

        for fleet in &config.fleets {
            manager.register_fleet(Arc::new(fleet.clone())).await;
        }

        let refresh = manager.spawn_refresh_loop();
        Self { manager, refresh }
    }

    pub fn manager(&self) -> &Arc<FleetManager> {
        &self.manager
    }

    /// Log the current size of every registered fleet.
    ///
    /// Returns how many fleets reported a size.
    pub async fn report_sizes(&self) -> usize {
        let mut reported = 0;
        for fleet in self.manager.fleets().await {
            match self.manager.get_size(&fleet).await {
                Ok(size) => {
                    reported += 1;
                    info!(
                        fleet = %fleet.name(),
                        size,
                        min_size = fleet.min_size(),
                        max_size = fleet.max_size(),
                        "Fleet size"
                    );
                    if size < fleet.min_size() || size > fleet.max_size() {
                        warn!(
                            fleet = %fleet.name(),
                            size,
                            "Fleet size outside configured bounds"
                        );
                    }
                }
                Err(e) => {
                    warn!(fleet = %fleet.name(), error = %e, "Failed to get fleet size");
                }
            }
        }
        reported
    }

    /// Wait for `signal`, then shut down.
    ///
    /// The agent shuts down even if listening for the signal fails.
    pub async fn run_until<F>(self, signal: F)
    where
        F: Future<Output = io::Result<()>>,
    {
        match signal.await {
            Ok(()) => info!("Received shutdown signal"),
            Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
        }
        self.shutdown().await;
    }

    /// Stop the refresh loop and wait for it to exit.
    pub async fn shutdown(self) {
        self.manager.shutdown();
        if let Err(e) = self.refresh.await {
            warn!(error = %e, "Refresh loop task panicked");
        }
        info!("Fleet agent stopped");
    }
}
