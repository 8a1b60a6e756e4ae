//! Field diff between the desired configuration and an observed domain.
//!
//! Only a fixed set of keys is compared: the name, the access policy and the
//! three option blocks. The engine version is never compared because it cannot
//! be changed through a config update.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::DomainConfig;
use crate::elasticsearch::DomainStatus;

/// A single differing field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    /// Input key of the field.
    pub field: &'static str,
    /// Observed value.
    pub current: Value,
    /// Desired value.
    pub desired: Value,
}

/// Differences between a desired configuration and an observed domain.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DomainDiff {
    /// Fields that differ.
    pub changes: Vec<FieldChange>,
}

impl DomainDiff {
    /// Compares the desired configuration for `name` with the observed domain.
    ///
    /// A desired access policy of `None` places no constraint on the observed
    /// one. Otherwise the observed policy only has to contain the desired one,
    /// so fields the provider adds on its side do not count as drift.
    #[must_use]
    pub fn compute(name: &str, desired: &DomainConfig, observed: &DomainStatus) -> Self {
        let mut diff = Self::default();

        if observed.name != name {
            diff.push("name", to_value(&observed.name), to_value(&name));
        }

        if let Some(policy) = &desired.access_policies
            && !observed
                .access_policies
                .as_ref()
                .is_some_and(|current| contains(current, policy))
        {
            diff.push(
                "accessPolicies",
                to_value(&observed.access_policies),
                policy.clone(),
            );
        }

        if !desired.ebs_options.is_satisfied_by(&observed.ebs_options) {
            diff.push(
                "ebsOptions",
                to_value(&observed.ebs_options),
                to_value(&desired.ebs_options),
            );
        }

        if desired.elasticsearch_cluster_config != observed.cluster_config {
            diff.push(
                "elasticsearchClusterConfig",
                to_value(&observed.cluster_config),
                to_value(&desired.elasticsearch_cluster_config),
            );
        }

        if desired.snapshot_options != observed.snapshot_options {
            diff.push(
                "snapshotOptions",
                to_value(&observed.snapshot_options),
                to_value(&desired.snapshot_options),
            );
        }

        if diff.is_empty() {
            debug!("Config of domain {name} did not change");
        }

        diff
    }

    /// Returns true if nothing differs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Returns the names of the differing fields.
    #[must_use]
    pub fn fields(&self) -> Vec<&'static str> {
        self.changes.iter().map(|c| c.field).collect()
    }

    fn push(&mut self, field: &'static str, current: Value, desired: Value) {
        debug!("Field {field} differs");
        self.changes.push(FieldChange {
            field,
            current,
            desired,
        });
    }
}

/// Checks that `observed` holds at least what `desired` holds.
///
/// Objects match when every desired key matches. Arrays match when every
/// desired element matches some observed element. Anything else must be equal.
fn contains(observed: &Value, desired: &Value) -> bool {
    match (observed, desired) {
        (Value::Object(observed), Value::Object(desired)) => desired.iter().all(|(key, want)| {
            observed.get(key).is_some_and(|have| contains(have, want))
        }),
        (Value::Array(observed), Value::Array(desired)) => desired
            .iter()
            .all(|want| observed.iter().any(|have| contains(have, want))),
        _ => observed == desired,
    }
}

fn to_value<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_default()
}
