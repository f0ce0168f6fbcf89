//! Membership snapshots.
//!
//! A snapshot holds two mappings built together from one full enumeration
//! of every registered fleet:
//!
//! - owner: instance -> owning fleet descriptor
//! - remote id: instance -> raw instance id for the delete verb
//!
//! Snapshots are immutable once built. A rebuild produces a new snapshot and
//! the manager swaps it in whole, so both mappings always share a domain.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::api::FleetApi;
use crate::error::{MembershipError, Result};
use crate::registry::FleetRegistry;
use crate::types::{FleetDescriptor, InstanceRef};

/// Immutable instance-to-fleet mapping pair.
#[derive(Debug, Default, Clone)]
pub struct MembershipSnapshot {
    owners: HashMap<InstanceRef, Arc<FleetDescriptor>>,
    remote_ids: HashMap<InstanceRef, String>,
}

impl MembershipSnapshot {
    /// Number of cached instances.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn contains(&self, instance: &InstanceRef) -> bool {
        self.owners.contains_key(instance)
    }

    /// Owning fleet of an instance.
    pub fn owner_of(&self, instance: &InstanceRef) -> Option<&Arc<FleetDescriptor>> {
        self.owners.get(instance)
    }

    /// Raw remote instance id of an instance.
    pub fn remote_id_of(&self, instance: &InstanceRef) -> Option<&str> {
        self.remote_ids.get(instance).map(String::as_str)
    }

    /// All cached instances, in no particular order.
    pub fn instances(&self) -> impl Iterator<Item = &InstanceRef> {
        self.owners.keys()
    }

    /// Later inserts for the same key replace earlier ones.
    fn insert(&mut self, instance: InstanceRef, owner: Arc<FleetDescriptor>, remote_id: String) {
        self.remote_ids.insert(instance.clone(), remote_id);
        self.owners.insert(instance, owner);
    }
}

impl PartialEq for MembershipSnapshot {
    /// Owners compare by descriptor identity, not by value.
    fn eq(&self, other: &Self) -> bool {
        self.remote_ids == other.remote_ids
            && self.owners.len() == other.owners.len()
            && self.owners.iter().all(|(instance, owner)| {
                other
                    .owners
                    .get(instance)
                    .is_some_and(|o| Arc::ptr_eq(o, owner))
            })
    }
}

impl Eq for MembershipSnapshot {}

/// Output of a successful enumeration, not yet committed.
#[derive(Debug)]
pub(crate) struct Enumeration {
    pub(crate) snapshot: MembershipSnapshot,
    /// Canonical basenames, index-aligned with the registry entries.
    pub(crate) basenames: Vec<String>,
}

/// Enumerate every registered fleet in registration order.
///
/// Aborts on the first remote failure. Nothing is committed here; the
/// caller swaps the result in only when this returns `Ok`.
pub(crate) async fn enumerate(api: &dyn FleetApi, registry: &FleetRegistry) -> Result<Enumeration> {
    let mut snapshot = MembershipSnapshot::default();
    let mut basenames = Vec::with_capacity(registry.len());

    for entry in registry.entries() {
        let name = entry.descriptor.name();
        debug!(fleet = %name, "Regenerating fleet membership");

        let description = api
            .describe_fleet(name)
            .await
            .map_err(|e| MembershipError::remote("describe fleet", name, e))?;
        let basename = description.name;

        let members = api
            .list_members(&basename)
            .await
            .map_err(|e| MembershipError::remote("list fleet members", basename.as_str(), e))?;

        debug!(
            fleet = %name,
            basename = %basename,
            member_count = members.len(),
            "Listed fleet members"
        );

        for member in members {
            let instance = InstanceRef::from_remote_id(&member.remote_id);
            snapshot.insert(instance, Arc::clone(&entry.descriptor), member.instance_id);
        }

        basenames.push(basename);
    }

    Ok(Enumeration {
        snapshot,
        basenames,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::mock::MockFleetApi;

    fn fleet(name: &str) -> Arc<FleetDescriptor> {
        Arc::new(FleetDescriptor::new(name, 0, 10))
    }

    fn owner_keys(snapshot: &MembershipSnapshot) -> HashSet<&InstanceRef> {
        snapshot.owners.keys().collect()
    }

    fn remote_id_keys(snapshot: &MembershipSnapshot) -> HashSet<&InstanceRef> {
        snapshot.remote_ids.keys().collect()
    }

    #[tokio::test]
    async fn test_enumerate_keeps_domains_equal() {
        let api = MockFleetApi::new();
        api.add_fleet("pool-a", 0);
        api.add_fleet("pool-b", 0);
        api.add_member("pool-a", "0", "/vms/a-0");
        api.add_member("pool-a", "1", "/vms/shared");
        api.add_member("pool-b", "0", "/vms/b-0");
        api.add_member("pool-b", "5", "/VMs/Shared");

        let mut registry = FleetRegistry::default();
        registry.register(fleet("pool-a"));
        registry.register(fleet("pool-b"));

        let enumeration = enumerate(&api, &registry).await.unwrap();
        let snapshot = &enumeration.snapshot;

        assert_eq!(snapshot.len(), 3);
        assert_eq!(owner_keys(snapshot), remote_id_keys(snapshot));

        let shared = InstanceRef::from_remote_id("/vms/shared");
        assert_eq!(snapshot.owner_of(&shared).unwrap().name(), "pool-b");
        assert_eq!(snapshot.remote_id_of(&shared), Some("5"));
        assert_eq!(enumeration.basenames, vec!["pool-a", "pool-b"]);
    }

    #[test]
    fn test_insert_keeps_domains_equal() {
        let a = fleet("pool-a");
        let mut snapshot = MembershipSnapshot::default();
        let i1 = InstanceRef::from_remote_id("/vms/1");

        snapshot.insert(i1.clone(), Arc::clone(&a), "1".to_string());

        assert_eq!(snapshot.len(), 1);
        assert!(Arc::ptr_eq(snapshot.owner_of(&i1).unwrap(), &a));
        assert_eq!(snapshot.remote_id_of(&i1), Some("1"));
    }

    #[test]
    fn test_later_insert_wins() {
        let a = fleet("pool-a");
        let b = fleet("pool-b");
        let mut snapshot = MembershipSnapshot::default();
        let i1 = InstanceRef::from_remote_id("/vms/1");

        snapshot.insert(i1.clone(), Arc::clone(&a), "1".to_string());
        snapshot.insert(i1.clone(), Arc::clone(&b), "7".to_string());

        assert_eq!(snapshot.len(), 1);
        assert_eq!(owner_keys(&snapshot), remote_id_keys(&snapshot));
        assert!(Arc::ptr_eq(snapshot.owner_of(&i1).unwrap(), &b));
        assert_eq!(snapshot.remote_id_of(&i1), Some("7"));
    }

    #[test]
    fn test_equality_uses_descriptor_identity() {
        let i1 = InstanceRef::from_remote_id("/vms/1");

        let mut left = MembershipSnapshot::default();
        left.insert(i1.clone(), fleet("pool-a"), "1".to_string());
        let mut right = MembershipSnapshot::default();
        right.insert(i1, fleet("pool-a"), "1".to_string());

        assert_ne!(left, right);
        assert_eq!(left, left.clone());
    }
}
