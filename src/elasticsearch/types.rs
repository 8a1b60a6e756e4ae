//! Elasticsearch Service domain types.
//!
//! This module defines the observed domain status and the request payloads
//! sent to the control plane, independent of the SDK's own types.

use serde::Serialize;
use serde_json::Value;

use crate::config::{ClusterConfig, DomainConfig, EbsOptions, SnapshotOptions};
use crate::error::{DeployError, ProviderError, Result, StateError};

/// Observed state of a remote domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainStatus {
    /// Provider-assigned domain identifier.
    pub id: String,
    /// Domain ARN.
    pub arn: String,
    /// Domain name.
    pub name: String,
    /// Public endpoint, absent until the domain has been provisioned.
    pub endpoint: Option<String>,
    /// True while a configuration change or upgrade is in flight.
    pub processing: bool,
    /// Engine version.
    pub elasticsearch_version: Option<String>,
    /// Cluster topology.
    pub cluster_config: ClusterConfig,
    /// EBS storage options.
    pub ebs_options: EbsOptions,
    /// Automated snapshot schedule.
    pub snapshot_options: SnapshotOptions,
    /// Access policy document, if one is attached.
    pub access_policies: Option<Value>,
}

impl DomainStatus {
    /// Returns true once the domain is settled and reachable.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.processing && self.endpoint.as_deref().is_some_and(|e| !e.is_empty())
    }
}

/// Payload for creating a domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateDomainRequest {
    /// Domain name.
    pub domain_name: String,
    /// Engine version.
    pub elasticsearch_version: String,
    /// Access policy as JSON text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_policies: Option<String>,
    /// EBS storage options.
    #[serde(rename = "EBSOptions")]
    pub ebs_options: EbsOptions,
    /// Cluster topology.
    pub elasticsearch_cluster_config: ClusterConfig,
    /// Automated snapshot schedule.
    pub snapshot_options: SnapshotOptions,
}

/// Payload for updating a domain's configuration.
///
/// The engine version cannot be changed through a config update, so it is not
/// part of this payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateDomainRequest {
    /// Domain name.
    pub domain_name: String,
    /// Access policy as JSON text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_policies: Option<String>,
    /// EBS storage options.
    #[serde(rename = "EBSOptions")]
    pub ebs_options: EbsOptions,
    /// Cluster topology.
    pub elasticsearch_cluster_config: ClusterConfig,
    /// Automated snapshot schedule.
    pub snapshot_options: SnapshotOptions,
}

impl CreateDomainRequest {
    /// Builds a create payload for `name` from the desired configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the access policy cannot be serialized.
    pub fn new(name: &str, config: &DomainConfig) -> Result<Self> {
        Ok(Self {
            domain_name: name.to_string(),
            elasticsearch_version: config.elasticsearch_version.clone(),
            access_policies: policy_text(config.access_policies.as_ref())?,
            ebs_options: config.ebs_options.clone(),
            elasticsearch_cluster_config: config.elasticsearch_cluster_config.clone(),
            snapshot_options: config.snapshot_options,
        })
    }
}

impl UpdateDomainRequest {
    /// Builds an update payload for `name` from the desired configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the access policy cannot be serialized.
    pub fn new(name: &str, config: &DomainConfig) -> Result<Self> {
        Ok(Self {
            domain_name: name.to_string(),
            access_policies: policy_text(config.access_policies.as_ref())?,
            ebs_options: config.ebs_options.clone(),
            elasticsearch_cluster_config: config.elasticsearch_cluster_config.clone(),
            snapshot_options: config.snapshot_options,
        })
    }
}

/// Serializes a policy document to the JSON text the provider expects.
fn policy_text(policy: Option<&Value>) -> Result<Option<String>> {
    policy
        .map(|p| {
            serde_json::to_string(p).map_err(|e| {
                DeployError::State(StateError::serialization(format!(
                    "Failed to serialize access policy: {e}"
                )))
            })
        })
        .transpose()
}

/// Parses the policy text returned by the provider.
///
/// An empty string means no policy is attached.
///
/// # Errors
///
/// Returns an error if the text is not valid JSON.
pub fn parse_access_policies(text: Option<&str>) -> Result<Option<Value>> {
    match text.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => serde_json::from_str(text).map(Some).map_err(|e| {
            DeployError::Provider(ProviderError::InvalidResponse {
                message: format!("Access policy is not valid JSON: {e}"),
            })
        }),
    }
}
