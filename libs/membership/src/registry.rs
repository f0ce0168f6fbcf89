//! Ordered list of fleets the manager tracks.

use std::sync::Arc;

use crate::types::FleetDescriptor;

/// A registered fleet plus the canonical name last observed remotely.
#[derive(Debug, Clone)]
pub(crate) struct RegistryEntry {
    pub(crate) descriptor: Arc<FleetDescriptor>,
    pub(crate) observed_basename: String,
}

/// Registered fleets in registration order.
///
/// Duplicate names are kept as distinct entries. There is no removal.
#[derive(Debug, Default)]
pub(crate) struct FleetRegistry {
    entries: Vec<RegistryEntry>,
}

impl FleetRegistry {
    pub(crate) fn register(&mut self, descriptor: Arc<FleetDescriptor>) {
        let observed_basename = descriptor.name().to_string();
        self.entries.push(RegistryEntry {
            descriptor,
            observed_basename,
        });
    }

    pub(crate) fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Commits the basenames observed by a successful rebuild.
    ///
    /// `basenames` is index-aligned with [`Self::entries`].
    pub(crate) fn commit_basenames(&mut self, basenames: Vec<String>) {
        debug_assert_eq!(basenames.len(), self.entries.len());
        for (entry, basename) in self.entries.iter_mut().zip(basenames) {
            entry.observed_basename = basename;
        }
    }
}
