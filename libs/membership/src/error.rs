//! Error types for membership lookups and fleet operations.

use thiserror::Error;

use crate::types::InstanceRef;

/// Errors that can occur when parsing an instance reference.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RefError {
    /// The reference string is empty.
    #[error("instance reference cannot be empty")]
    Empty,

    /// The reference does not carry the platform scheme.
    #[error("instance reference missing scheme: expected '{expected}', got '{actual}'")]
    MissingScheme {
        expected: &'static str,
        actual: String,
    },
}

/// Errors returned by [`FleetManager`](crate::FleetManager) operations.
#[derive(Debug, Error)]
pub enum MembershipError {
    /// A remote platform call failed. The source is surfaced unchanged.
    #[error("{operation} failed for fleet {fleet}: {source}")]
    Remote {
        operation: &'static str,
        fleet: String,
        #[source]
        source: anyhow::Error,
    },

    /// A bulk delete named instances owned by more than one fleet.
    #[error(
        "cannot delete instance ({instance}) which does not belong to the same fleet \
         (expected {expected}, found {actual})"
    )]
    CrossFleet {
        instance: InstanceRef,
        expected: String,
        actual: String,
    },

    /// The instance is not a member of any registered fleet.
    #[error("instance ({instance}) does not belong to any registered fleet")]
    Unmanaged { instance: InstanceRef },

    /// The snapshot that resolved the owner has no raw id for the instance.
    #[error("no remote instance id cached for instance ({instance})")]
    MissingRemoteId { instance: InstanceRef },
}

impl MembershipError {
    pub(crate) fn remote(
        operation: &'static str,
        fleet: impl Into<String>,
        source: anyhow::Error,
    ) -> Self {
        Self::Remote {
            operation,
            fleet: fleet.into(),
            source,
        }
    }

    /// Returns true if this error came from a remote platform call.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    /// Returns true if this error is a same-fleet consistency violation.
    pub fn is_cross_fleet(&self) -> bool {
        matches!(self, Self::CrossFleet { .. })
    }
}

pub type Result<T, E = MembershipError> = std::result::Result<T, E>;
