//! Deployment plan types and construction.
//!
//! A plan records what a deploy would do to the domain: create it, update
//! some of its fields, or leave it alone.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::DomainConfig;
use crate::elasticsearch::DomainStatus;
use crate::state::NameInput;

use super::diff::{DomainDiff, FieldChange};
use super::naming::NameResolution;

/// The planned action for the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    /// The domain does not exist and will be created.
    Create,
    /// The domain exists and some fields will be updated.
    Update,
    /// The domain already matches the desired configuration.
    NoChange,
}

/// A deployment plan for one domain.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainPlan {
    /// When the plan was created.
    pub created_at: DateTime<Utc>,
    /// Domain name the plan applies to.
    pub name: String,
    /// Name input recorded for the domain.
    pub name_input: NameInput,
    /// True if the name was taken from prior state.
    pub name_reused: bool,
    /// Region hosting the domain.
    pub region: String,
    /// Planned action.
    pub action: PlanAction,
    /// Fields that will change on update.
    pub changes: Vec<FieldChange>,
    /// True if the domain is processing and must settle first.
    pub awaiting_processing: bool,
}

impl PlanAction {
    /// Returns the display name of the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::NoChange => "no change",
        }
    }
}

impl std::fmt::Display for PlanAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DomainPlan {
    /// Builds a plan from the desired configuration and the observed domain.
    #[must_use]
    pub fn new(
        resolution: &NameResolution,
        config: &DomainConfig,
        observed: Option<&DomainStatus>,
    ) -> Self {
        let (action, changes, awaiting_processing) = match observed {
            None => (PlanAction::Create, Vec::new(), false),
            Some(status) => {
                let diff = DomainDiff::compute(&resolution.name, config, status);
                let action = if diff.is_empty() {
                    PlanAction::NoChange
                } else {
                    PlanAction::Update
                };
                (action, diff.changes, status.processing)
            }
        };

        Self {
            created_at: Utc::now(),
            name: resolution.name.clone(),
            name_input: resolution.name_input.clone(),
            name_reused: resolution.reused,
            region: config.region.clone(),
            action,
            changes,
            awaiting_processing,
        }
    }

    /// Returns true if applying the plan issues a mutating call.
    #[must_use]
    pub const fn has_changes(&self) -> bool {
        !matches!(self.action, PlanAction::NoChange)
    }

    /// Returns a one-line summary of the plan.
    #[must_use]
    pub fn summary(&self) -> String {
        match self.action {
            PlanAction::Create => format!("Create domain {} in {}", self.name, self.region),
            PlanAction::Update => format!(
                "Update domain {} ({})",
                self.name,
                self.changes
                    .iter()
                    .map(|c| c.field)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            PlanAction::NoChange => format!("Domain {} is up to date", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClusterConfig, EbsOptions, SnapshotOptions};

    fn resolution() -> NameResolution {
        NameResolution {
            name: String::from("logs-abc12345"),
            name_input: NameInput::Named(String::from("logs")),
            reused: true,
        }
    }

    fn observed(config: &DomainConfig, processing: bool) -> DomainStatus {
        DomainStatus {
            id: String::from("123456789012/logs-abc12345"),
            arn: String::from("arn:aws:es:us-east-1:123456789012:domain/logs-abc12345"),
            name: String::from("logs-abc12345"),
            endpoint: None,
            processing,
            elasticsearch_version: None,
            cluster_config: config.elasticsearch_cluster_config.clone(),
            ebs_options: config.ebs_options.clone(),
            snapshot_options: config.snapshot_options,
            access_policies: None,
        }
    }

    #[test]
    fn test_absent_domain_plans_create() {
        let plan = DomainPlan::new(&resolution(), &DomainConfig::default(), None);
        assert_eq!(plan.action, PlanAction::Create);
        assert!(plan.has_changes());
        assert!(plan.summary().starts_with("Create domain logs-abc12345"));
    }

    #[test]
    fn test_matching_domain_plans_nothing() {
        let config = DomainConfig::default();
        let plan = DomainPlan::new(&resolution(), &config, Some(&observed(&config, true)));

        assert_eq!(plan.action, PlanAction::NoChange);
        assert!(!plan.has_changes());
        assert!(plan.awaiting_processing);
    }

    #[test]
    fn test_differing_domain_plans_update() {
        let config = DomainConfig::default();
        let mut remote = observed(&config, false);
        remote.cluster_config = ClusterConfig {
            instance_count: 2,
            ..config.elasticsearch_cluster_config.clone()
        };
        remote.ebs_options = EbsOptions {
            volume_size: 35,
            ..config.ebs_options.clone()
        };
        remote.snapshot_options = SnapshotOptions::default();

        let plan = DomainPlan::new(&resolution(), &config, Some(&remote));
        assert_eq!(plan.action, PlanAction::Update);
        assert_eq!(
            plan.summary(),
            "Update domain logs-abc12345 (ebsOptions, elasticsearchClusterConfig)"
        );
    }
}
