//! Remote fleet platform interface.
//!
//! The platform exposes four verbs the manager depends on:
//! - Describing a fleet (capacity and canonical name)
//! - Listing a fleet's members
//! - Submitting a full fleet update
//! - Deleting a batch of members
//!
//! Transport, authentication, and timeouts belong to the implementation.
//! Every verb blocks until the platform acknowledges.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;

/// A fleet as reported by the remote platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetDescription {
    /// Canonical name; may differ in case or format from the registered name.
    pub name: String,

    /// Current capacity (instance count).
    pub capacity: i64,

    /// Transient provisioning state. Rejected by the platform on write.
    pub provisioning_state: Option<String>,

    /// Opaque remote metadata carried through updates unchanged.
    pub metadata: BTreeMap<String, String>,
}

/// One member of a fleet as reported by the remote platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetMember {
    /// Raw instance id accepted by the delete verb.
    pub instance_id: String,

    /// Full resource path, normalized into the cache key.
    pub remote_id: String,
}

/// Remote fleet platform interface.
#[async_trait]
pub trait FleetApi: Send + Sync {
    /// Describe a fleet.
    async fn describe_fleet(&self, name: &str) -> Result<FleetDescription>;

    /// List the members of a fleet.
    async fn list_members(&self, name: &str) -> Result<Vec<FleetMember>>;

    /// Submit a full fleet update.
    async fn update_fleet(&self, name: &str, fleet: &FleetDescription) -> Result<()>;

    /// Delete a batch of members by raw instance id.
    async fn delete_members(&self, name: &str, instance_ids: &[String]) -> Result<()>;
}
