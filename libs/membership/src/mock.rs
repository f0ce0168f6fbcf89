//! In-process fleet platform for testing and development.
//!
//! Fleet names are matched case-insensitively, like the real platform.
//! Every verb counts its calls, and failures can be injected per verb and
//! per fleet.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::api::{FleetApi, FleetDescription, FleetMember};

/// Remote verbs that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockVerb {
    Describe,
    List,
    Update,
    Delete,
}

#[derive(Debug, Clone)]
struct MockFleet {
    canonical_name: String,
    capacity: i64,
    members: Vec<FleetMember>,
}

#[derive(Debug, Default)]
struct MockState {
    /// Keyed by lower-cased name.
    fleets: BTreeMap<String, MockFleet>,
    failures: HashSet<(MockVerb, String)>,
    updates: Vec<(String, FleetDescription)>,
    deletes: Vec<(String, Vec<String>)>,
}

/// Mock fleet platform.
#[derive(Debug, Default)]
pub struct MockFleetApi {
    state: Mutex<MockState>,
    latency: Duration,
    describe_calls: AtomicUsize,
    list_calls: AtomicUsize,
    update_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl MockFleetApi {
    /// Create an empty mock platform.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a fleet with the given capacity and no members.
    pub fn add_fleet(&self, name: &str, capacity: i64) {
        self.state().fleets.insert(
            name.to_lowercase(),
            MockFleet {
                canonical_name: name.to_string(),
                capacity,
                members: Vec::new(),
            },
        );
    }

    /// Report a different canonical name for a fleet.
    pub fn set_canonical_name(&self, name: &str, canonical: &str) {
        if let Some(fleet) = self.state().fleets.get_mut(&name.to_lowercase()) {
            fleet.canonical_name = canonical.to_string();
        }
    }

    /// Add a member to a fleet.
    pub fn add_member(&self, fleet: &str, instance_id: &str, remote_id: &str) {
        if let Some(fleet) = self.state().fleets.get_mut(&fleet.to_lowercase()) {
            fleet.members.push(FleetMember {
                instance_id: instance_id.to_string(),
                remote_id: remote_id.to_string(),
            });
        }
    }

    /// Make `verb` fail for `fleet` until cleared.
    pub fn fail(&self, verb: MockVerb, fleet: &str) {
        self.state().failures.insert((verb, fleet.to_lowercase()));
    }

    pub fn clear_failures(&self) {
        self.state().failures.clear();
    }

    /// Current capacity of a fleet.
    pub fn capacity(&self, fleet: &str) -> Option<i64> {
        self.state()
            .fleets
            .get(&fleet.to_lowercase())
            .map(|f| f.capacity)
    }

    /// Updates accepted so far, in order.
    pub fn updates(&self) -> Vec<(String, FleetDescription)> {
        self.state().updates.clone()
    }

    /// Deletes accepted so far, in order.
    pub fn deletes(&self) -> Vec<(String, Vec<String>)> {
        self.state().deletes.clone()
    }

    pub fn describe_calls(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Total remote calls across every verb.
    pub fn total_calls(&self) -> usize {
        self.describe_calls() + self.list_calls() + self.update_calls() + self.delete_calls()
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn check_failure(&self, verb: MockVerb, name: &str) -> Result<()> {
        if self.state().failures.contains(&(verb, name.to_lowercase())) {
            anyhow::bail!("[MOCK] {verb:?} configured to fail for fleet {name}");
        }
        Ok(())
    }
}

#[async_trait]
impl FleetApi for MockFleetApi {
    async fn describe_fleet(&self, name: &str) -> Result<FleetDescription> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        self.check_failure(MockVerb::Describe, name)?;

        let state = self.state();
        let Some(fleet) = state.fleets.get(&name.to_lowercase()) else {
            anyhow::bail!("[MOCK] fleet {name} not found");
        };

        debug!(fleet = %name, capacity = fleet.capacity, "[MOCK] Describing fleet");
        Ok(FleetDescription {
            name: fleet.canonical_name.clone(),
            capacity: fleet.capacity,
            provisioning_state: Some("Succeeded".to_string()),
            metadata: BTreeMap::new(),
        })
    }

    async fn list_members(&self, name: &str) -> Result<Vec<FleetMember>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        self.check_failure(MockVerb::List, name)?;

        let state = self.state();
        let Some(fleet) = state.fleets.get(&name.to_lowercase()) else {
            anyhow::bail!("[MOCK] fleet {name} not found");
        };
        Ok(fleet.members.clone())
    }

    async fn update_fleet(&self, name: &str, update: &FleetDescription) -> Result<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        self.check_failure(MockVerb::Update, name)?;

        if update.provisioning_state.is_some() {
            anyhow::bail!("[MOCK] provisioning state is read-only");
        }

        let mut state = self.state();
        let Some(fleet) = state.fleets.get_mut(&name.to_lowercase()) else {
            anyhow::bail!("[MOCK] fleet {name} not found");
        };
        fleet.capacity = update.capacity;
        state.updates.push((name.to_string(), update.clone()));

        debug!(fleet = %name, capacity = update.capacity, "[MOCK] Fleet updated");
        Ok(())
    }

    async fn delete_members(&self, name: &str, instance_ids: &[String]) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        self.check_failure(MockVerb::Delete, name)?;

        let mut state = self.state();
        let Some(fleet) = state.fleets.get_mut(&name.to_lowercase()) else {
            anyhow::bail!("[MOCK] fleet {name} not found");
        };
        let before = fleet.members.len();
        fleet
            .members
            .retain(|m| !instance_ids.contains(&m.instance_id));
        let removed = (before - fleet.members.len()) as i64;
        fleet.capacity = (fleet.capacity - removed).max(0);
        state.deletes.push((name.to_string(), instance_ids.to_vec()));

        debug!(fleet = %name, removed, "[MOCK] Members deleted");
        Ok(())
    }
}
