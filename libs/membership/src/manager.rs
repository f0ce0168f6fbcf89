//! Fleet manager: the cache coordinator.
//!
//! The manager owns one exclusive lock guarding the fleet registry and the
//! current membership snapshot together. Lookups, deletes, and rebuilds all
//! go through it:
//!
//! - A lookup miss rebuilds synchronously while holding the lock, so
//!   concurrent misses queue behind one rebuild instead of starting their own.
//! - A failed rebuild leaves the previous snapshot (and registry basenames)
//!   untouched. Stale data stays authoritative until a rebuild succeeds.
//! - Size reads and writes talk to the platform directly and never take the
//!   lock.
//! - Deleted instances stay cached until the next rebuild observes them gone.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info};

use crate::api::FleetApi;
use crate::error::{MembershipError, Result};
use crate::registry::FleetRegistry;
use crate::snapshot::{self, MembershipSnapshot};
use crate::types::{FleetDescriptor, InstanceRef};

/// Default interval between scheduled rebuilds.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Fleet manager configuration.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Interval between scheduled rebuilds.
    pub refresh_interval: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

/// State guarded by the manager's lock.
#[derive(Debug, Default)]
struct State {
    registry: FleetRegistry,
    snapshot: Arc<MembershipSnapshot>,
}

/// Coordinates the membership cache with the remote fleet platform.
pub struct FleetManager {
    api: Arc<dyn FleetApi>,
    config: ManagerConfig,
    state: Mutex<State>,
    shutdown: watch::Sender<bool>,
}

impl FleetManager {
    /// Create a manager with an empty registry and an empty cache.
    pub fn new(api: Arc<dyn FleetApi>, config: ManagerConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            api,
            config,
            state: Mutex::new(State::default()),
            shutdown,
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Register a fleet. Registering the same name twice yields two entries.
    pub async fn register_fleet(&self, descriptor: Arc<FleetDescriptor>) {
        let mut state = self.state.lock().await;
        info!(
            fleet = %descriptor.name(),
            min_size = descriptor.min_size(),
            max_size = descriptor.max_size(),
            "Registered fleet"
        );
        state.registry.register(descriptor);
    }

    /// Registered fleets in registration order.
    pub async fn fleets(&self) -> Vec<Arc<FleetDescriptor>> {
        let state = self.state.lock().await;
        state
            .registry
            .entries()
            .iter()
            .map(|e| Arc::clone(&e.descriptor))
            .collect()
    }

    /// Canonical name last observed for the first fleet registered as `name`.
    pub async fn observed_basename(&self, name: &str) -> Option<String> {
        let state = self.state.lock().await;
        state
            .registry
            .entries()
            .iter()
            .find(|e| e.descriptor.name() == name)
            .map(|e| e.observed_basename.clone())
    }

    /// The current membership snapshot.
    pub async fn snapshot(&self) -> Arc<MembershipSnapshot> {
        Arc::clone(&self.state.lock().await.snapshot)
    }

    /// Rebuild the cache now.
    pub async fn refresh(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        self.rebuild(&mut state).await
    }

    /// Replace the snapshot from a full enumeration of the registry.
    ///
    /// Takes the guarded state, so the lock is held for the whole rebuild.
    async fn rebuild(&self, state: &mut State) -> Result<()> {
        let enumeration = snapshot::enumerate(self.api.as_ref(), &state.registry).await?;

        info!(
            fleet_count = state.registry.len(),
            instance_count = enumeration.snapshot.len(),
            "Membership cache rebuilt"
        );

        state.registry.commit_basenames(enumeration.basenames);
        state.snapshot = Arc::new(enumeration.snapshot);
        Ok(())
    }

    /// Current capacity of a fleet.
    pub async fn get_size(&self, fleet: &FleetDescriptor) -> Result<i64> {
        debug!(fleet = %fleet.name(), "Get fleet size");
        let description = self
            .api
            .describe_fleet(fleet.name())
            .await
            .map_err(|e| MembershipError::remote("describe fleet", fleet.name(), e))?;

        debug!(fleet = %fleet.name(), capacity = description.capacity, "Returning fleet capacity");
        Ok(description.capacity)
    }

    /// Set the capacity of a fleet, waiting for the platform to acknowledge.
    pub async fn set_size(&self, fleet: &FleetDescriptor, target: i64) -> Result<()> {
        let mut description = self
            .api
            .describe_fleet(fleet.name())
            .await
            .map_err(|e| MembershipError::remote("describe fleet", fleet.name(), e))?;

        let previous = description.capacity;
        description.capacity = target;
        description.provisioning_state = None;

        self.api
            .update_fleet(fleet.name(), &description)
            .await
            .map_err(|e| MembershipError::remote("update fleet", fleet.name(), e))?;

        info!(fleet = %fleet.name(), previous, target, "Fleet size updated");
        Ok(())
    }

    /// Owning fleet of an instance.
    ///
    /// Rebuilds the cache on a miss. `Ok(None)` means the instance belongs
    /// to no registered fleet.
    pub async fn find_owner(&self, instance: &InstanceRef) -> Result<Option<Arc<FleetDescriptor>>> {
        let mut state = self.state.lock().await;
        if let Some(owner) = state.snapshot.owner_of(instance) {
            return Ok(Some(Arc::clone(owner)));
        }

        debug!(instance = %instance, "Fleet lookup missed cache, rebuilding");
        self.rebuild(&mut state).await?;

        let owner = state.snapshot.owner_of(instance).cloned();
        if owner.is_none() {
            debug!(instance = %instance, "Instance does not belong to any registered fleet");
        }
        Ok(owner)
    }

    /// Delete instances that all belong to one fleet.
    ///
    /// Owners and raw ids come from a single snapshot read under one lock
    /// acquisition. Nothing is deleted if any instance is unmanaged or owned
    /// by a different fleet than the first.
    pub async fn delete_instances(&self, instances: &[InstanceRef]) -> Result<()> {
        let Some(first) = instances.first() else {
            return Ok(());
        };

        let current = {
            let mut state = self.state.lock().await;
            if instances.iter().any(|i| !state.snapshot.contains(i)) {
                debug!(
                    instance_count = instances.len(),
                    "Delete batch missed cache, rebuilding"
                );
                self.rebuild(&mut state).await?;
            }
            Arc::clone(&state.snapshot)
        };

        let fleet = current
            .owner_of(first)
            .cloned()
            .ok_or_else(|| MembershipError::Unmanaged {
                instance: first.clone(),
            })?;

        let mut instance_ids = Vec::with_capacity(instances.len());
        for instance in instances {
            let owner = current
                .owner_of(instance)
                .ok_or_else(|| MembershipError::Unmanaged {
                    instance: instance.clone(),
                })?;
            if !Arc::ptr_eq(owner, &fleet) {
                return Err(MembershipError::CrossFleet {
                    instance: instance.clone(),
                    expected: fleet.name().to_string(),
                    actual: owner.name().to_string(),
                });
            }

            let instance_id =
                current
                    .remote_id_of(instance)
                    .ok_or_else(|| MembershipError::MissingRemoteId {
                        instance: instance.clone(),
                    })?;
            instance_ids.push(instance_id.to_string());
        }

        self.api
            .delete_members(fleet.name(), &instance_ids)
            .await
            .map_err(|e| MembershipError::remote("delete fleet members", fleet.name(), e))?;

        info!(
            fleet = %fleet.name(),
            instance_count = instance_ids.len(),
            "Deleted fleet members"
        );
        Ok(())
    }

    /// Members of a fleet straight from the platform. Does not touch the cache.
    pub async fn fleet_members(&self, fleet: &FleetDescriptor) -> Result<Vec<InstanceRef>> {
        let members = self.api.list_members(fleet.name()).await.map_err(|e| {
            debug!(fleet = %fleet.name(), error = %e, "Failed fleet member request");
            MembershipError::remote("list fleet members", fleet.name(), e)
        })?;

        Ok(members
            .iter()
            .map(|m| InstanceRef::from_remote_id(&m.remote_id))
            .collect())
    }

    /// Stop the scheduled refresh loop. Repeated calls are no-ops.
    pub fn shutdown(&self) {
        if self.shutdown.send_replace(true) {
            debug!("Fleet manager already shut down");
        } else {
            info!("Fleet manager shutting down");
        }
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    pub(crate) fn subscribe_shutdown(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }
}
