//! Scheduled membership rebuilds.
//!
//! The loop rebuilds once immediately and then every
//! [`ManagerConfig::refresh_interval`](crate::ManagerConfig) until
//! [`FleetManager::shutdown`] is called. Failures are logged and never
//! retried out of band: the next tick, or a lazy rebuild on lookup miss,
//! picks up from there.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::manager::FleetManager;

/// Failures tolerated before the loop escalates from warn to error.
const WARN_FAILURE_LIMIT: u32 = 3;

impl FleetManager {
    /// Spawn the scheduled refresh loop on the current runtime.
    pub fn spawn_refresh_loop(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let shutdown = self.subscribe_shutdown();
        tokio::spawn(run_refresh_loop(manager, shutdown))
    }
}

/// Run scheduled rebuilds until shutdown.
async fn run_refresh_loop(manager: Arc<FleetManager>, mut shutdown: watch::Receiver<bool>) {
    let period = manager
        .config()
        .refresh_interval
        .max(Duration::from_millis(1));

    if *shutdown.borrow() {
        debug!("Fleet manager already shut down, not starting refresh loop");
        return;
    }

    info!(
        interval_secs = period.as_secs(),
        "Starting membership refresh loop"
    );

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut consecutive_failures = 0u32;

    loop {
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("Membership refresh loop shutting down");
                    break;
                }
            }
            _ = ticker.tick() => {
                match manager.refresh().await {
                    Ok(()) => {
                        consecutive_failures = 0;
                    }
                    Err(e) => {
                        consecutive_failures += 1;
                        if consecutive_failures <= WARN_FAILURE_LIMIT {
                            warn!(
                                error = %e,
                                consecutive_failures,
                                "Error while regenerating membership cache"
                            );
                        } else {
                            error!(
                                error = %e,
                                consecutive_failures,
                                "Membership cache regeneration failing repeatedly"
                            );
                        }
                    }
                }
            }
        }
    }
}
