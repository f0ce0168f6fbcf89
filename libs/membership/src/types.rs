//! Instance references and fleet descriptors.
//!
//! An [`InstanceRef`] is the normalized identity of one compute instance.
//! Remote resource paths differ in letter case between API calls, so every
//! key is lower-cased and carries the platform scheme before it is compared.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::RefError;

/// Normalized identity of a single compute instance.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceRef(String);

impl InstanceRef {
    /// Scheme prefix carried by every instance key.
    pub const SCHEME: &'static str = "azure://";

    /// Builds a reference from a raw remote resource path.
    ///
    /// `/Subscriptions/S/.../virtualMachines/3` becomes
    /// `azure:///subscriptions/s/.../virtualmachines/3`.
    #[must_use]
    pub fn from_remote_id(remote_id: &str) -> Self {
        Self(format!("{}{}", Self::SCHEME, remote_id.trim().to_lowercase()))
    }

    /// Parses a caller-supplied key, normalizing it to lower case.
    ///
    /// The key must already carry [`Self::SCHEME`] (in any case).
    pub fn parse(s: &str) -> Result<Self, RefError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(RefError::Empty);
        }

        let normalized = trimmed.to_lowercase();
        if !normalized.starts_with(Self::SCHEME) {
            return Err(RefError::MissingScheme {
                expected: Self::SCHEME,
                actual: trimmed.to_string(),
            });
        }

        Ok(Self(normalized))
    }

    /// Returns the normalized key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for InstanceRef {
    type Err = RefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for InstanceRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A registered elastic scale group.
///
/// Owned by the caller that registers it. The manager keeps the same
/// `Arc<FleetDescriptor>` for every instance the fleet owns, so two
/// instances share a fleet iff their descriptors are pointer-equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetDescriptor {
    name: String,
    min_size: i64,
    max_size: i64,
    labels: BTreeMap<String, String>,
}

impl FleetDescriptor {
    /// Creates a descriptor with the given size bounds.
    pub fn new(name: impl Into<String>, min_size: i64, max_size: i64) -> Self {
        Self {
            name: name.into(),
            min_size,
            max_size,
            labels: BTreeMap::new(),
        }
    }

    /// Attaches caller-supplied metadata.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Registered fleet name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min_size(&self) -> i64 {
        self.min_size
    }

    pub fn max_size(&self) -> i64 {
        self.max_size
    }

    /// Caller-supplied metadata.
    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }
}

impl fmt::Display for FleetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}..={})", self.name, self.min_size, self.max_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[test]
    fn test_from_remote_id_lowercases_and_prefixes() {
        let r = InstanceRef::from_remote_id(
            "/subscriptions/SUB/resourceGroups/RG/providers/Microsoft.Compute/virtualMachineScaleSets/pool-a/virtualMachines/3",
        );
        assert_eq!(
            r.as_str(),
            "azure:///subscriptions/sub/resourcegroups/rg/providers/microsoft.compute/virtualmachinescalesets/pool-a/virtualmachines/3"
        );
    }

    #[test]
    fn test_mixed_case_ids_share_a_key() {
        let a = InstanceRef::from_remote_id("/Subscriptions/S/VMs/Node-1");
        let b = InstanceRef::from_remote_id("/subscriptions/s/vms/node-1");
        assert_eq!(a, b);

        let parsed: InstanceRef = "AZURE:///Subscriptions/S/VMs/NODE-1".parse().unwrap();
        assert_eq!(parsed, a);
    }

    #[rstest]
    #[case("", RefError::Empty)]
    #[case("   ", RefError::Empty)]
    #[case(
        "gce://project/zone/vm",
        RefError::MissingScheme { expected: "azure://", actual: "gce://project/zone/vm".to_string() }
    )]
    fn test_parse_rejects(#[case] input: &str, #[case] expected: RefError) {
        assert_eq!(InstanceRef::parse(input).unwrap_err(), expected);
    }

    #[test]
    fn test_descriptor_labels() {
        let d = FleetDescriptor::new("pool-a", 1, 10).with_label("tier", "gpu");
        assert_eq!(d.name(), "pool-a");
        assert_eq!(d.min_size(), 1);
        assert_eq!(d.max_size(), 10);
        assert_eq!(d.labels().get("tier").map(String::as_str), Some("gpu"));
        assert_eq!(d.to_string(), "pool-a (1..=10)");
    }

    proptest! {
        #[test]
        fn prop_case_variants_normalize_equal(path in "/[a-zA-Z0-9/_.-]{1,48}") {
            let upper = InstanceRef::from_remote_id(&path.to_uppercase());
            let lower = InstanceRef::from_remote_id(&path.to_lowercase());
            prop_assert_eq!(&upper, &lower);

            let reparsed = InstanceRef::parse(upper.as_str()).unwrap();
            prop_assert_eq!(reparsed, lower);
        }
    }
}
