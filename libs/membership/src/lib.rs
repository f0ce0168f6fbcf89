//! # fleetd-membership
//!
//! Maps compute instances to the elastic scale group (fleet) that owns
//! them, and guards bulk instance deletion with a same-fleet check.
//!
//! ## Architecture
//!
//! - **Registry**: fleets registered by the caller, in registration order
//! - **Snapshot**: instance -> owner and instance -> raw id, built together
//! - **Manager**: one lock over both; lazy rebuild on lookup miss
//! - **Refresh loop**: scheduled rebuild, stopped by an idempotent shutdown
//!
//! ## Invariants
//!
//! - Both snapshot mappings always have the same domain
//! - A failed rebuild commits nothing
//! - At most one rebuild runs at a time
//! - A bulk delete touches exactly one fleet or nothing

pub mod api;
pub mod error;
pub mod manager;
pub mod mock;
mod refresh;
mod registry;
pub mod snapshot;
pub mod types;

pub use api::{FleetApi, FleetDescription, FleetMember};
pub use error::{MembershipError, RefError};
pub use manager::{FleetManager, ManagerConfig, DEFAULT_REFRESH_INTERVAL};
pub use mock::{MockFleetApi, MockVerb};
pub use snapshot::MembershipSnapshot;
pub use types::{FleetDescriptor, InstanceRef};
