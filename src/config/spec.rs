//! Configuration specification types for the deployment system.
//!
//! This module defines the deployment file layout and the typed domain
//! inputs. Caller inputs stay untyped until they have been merged over the
//! defaults and normalized; only then are they read into [`DomainConfig`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{ConfigError, DeployError, Result};

use super::normalize::normalize;

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default Elasticsearch engine version.
pub const DEFAULT_ELASTICSEARCH_VERSION: &str = "6.7";

/// Default data node instance type.
pub const DEFAULT_INSTANCE_TYPE: &str = "t2.small.elasticsearch";

/// Default EBS volume type.
pub const DEFAULT_VOLUME_TYPE: &str = "gp2";

/// Default EBS volume size in GiB.
pub const DEFAULT_VOLUME_SIZE: i32 = 10;

/// Returns the default inputs every deployment is merged over.
#[must_use]
pub fn default_inputs() -> Value {
    json!({
        "region": DEFAULT_REGION,
        "elasticsearchVersion": DEFAULT_ELASTICSEARCH_VERSION,
        "accessPolicies": null,
        "ebsOptions": {
            "EBSEnabled": true,
            "VolumeSize": DEFAULT_VOLUME_SIZE,
            "VolumeType": DEFAULT_VOLUME_TYPE,
        },
        "elasticsearchClusterConfig": {
            "InstanceCount": 1,
            "InstanceType": DEFAULT_INSTANCE_TYPE,
        },
        "snapshotOptions": {
            "AutomatedSnapshotStartHour": 0,
        },
    })
}

/// The deployment file: where state lives and what to deploy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeploymentFile {
    /// State backend configuration.
    #[serde(default)]
    pub state: StateConfig,
    /// Raw caller inputs for the domain.
    #[serde(default = "empty_inputs")]
    pub inputs: Value,
}

/// State backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StateConfig {
    /// Backend type (local or s3).
    #[serde(default)]
    pub backend: StateBackend,
    /// S3 bucket name (required for s3 backend).
    #[serde(default)]
    pub bucket: Option<String>,
    /// S3 key prefix (optional).
    #[serde(default)]
    pub prefix: Option<String>,
    /// S3 region (optional, uses AWS default if not specified).
    #[serde(default)]
    pub region: Option<String>,
    /// Local state directory (for local backend).
    #[serde(default)]
    pub path: Option<String>,
}

/// State backend types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StateBackend {
    /// Local file-based state storage.
    #[default]
    Local,
    /// AWS S3-based state storage.
    S3,
}

/// Desired configuration of an Elasticsearch Service domain.
///
/// Field names follow the caller-facing input keys; nested option blocks use
/// the provider's wire casing.
///
/// Unknown keys are rejected rather than dropped, at every level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DomainConfig {
    /// AWS region hosting the domain.
    pub region: String,
    /// Name input supplied by the caller, if any.
    #[serde(default)]
    pub name: Option<String>,
    /// Engine version.
    pub elasticsearch_version: String,
    /// Access policy document.
    #[serde(default)]
    pub access_policies: Option<Value>,
    /// EBS storage options.
    pub ebs_options: EbsOptions,
    /// Cluster topology.
    pub elasticsearch_cluster_config: ClusterConfig,
    /// Automated snapshot schedule.
    pub snapshot_options: SnapshotOptions,
}

/// EBS storage options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct EbsOptions {
    /// Whether EBS volumes are attached to data nodes.
    #[serde(rename = "EBSEnabled")]
    pub ebs_enabled: bool,
    /// Volume size in GiB.
    #[serde(rename = "VolumeSize", default)]
    pub volume_size: i32,
    /// Volume type (`standard`, `gp2`, `io1`).
    #[serde(rename = "VolumeType", default)]
    pub volume_type: String,
}

/// Cluster topology.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct ClusterConfig {
    /// Number of data nodes.
    #[serde(rename = "InstanceCount")]
    pub instance_count: i32,
    /// Data node instance type.
    #[serde(rename = "InstanceType")]
    pub instance_type: String,
}

/// Automated snapshot schedule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct SnapshotOptions {
    /// UTC hour (0-23) at which the daily snapshot starts.
    #[serde(rename = "AutomatedSnapshotStartHour")]
    pub automated_snapshot_start_hour: i32,
}

impl StateConfig {
    /// Returns the local state directory.
    ///
    /// A relative `path`, like the default `default_dir`, is taken relative
    /// to `base`, the directory holding the deployment file.
    #[must_use]
    pub fn local_dir(&self, base: &Path, default_dir: &str) -> PathBuf {
        let dir = self.path.as_deref().map_or_else(|| Path::new(default_dir), Path::new);
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            base.join(dir)
        }
    }
}

fn empty_inputs() -> Value {
    Value::Object(serde_json::Map::new())
}

impl DomainConfig {
    /// Builds the effective configuration from raw caller inputs.
    ///
    /// Inputs are merged over [`default_inputs`] and normalized before being
    /// read into typed form.
    ///
    /// # Errors
    ///
    /// Returns an error if the normalized inputs do not describe a domain.
    pub fn from_inputs(inputs: &Value) -> Result<Self> {
        let normalized = normalize(inputs);
        serde_json::from_value(normalized).map_err(|e| {
            DeployError::Config(ConfigError::InvalidInputs {
                message: e.to_string(),
            })
        })
    }
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            name: None,
            elasticsearch_version: DEFAULT_ELASTICSEARCH_VERSION.to_string(),
            access_policies: None,
            ebs_options: EbsOptions {
                ebs_enabled: true,
                volume_size: DEFAULT_VOLUME_SIZE,
                volume_type: DEFAULT_VOLUME_TYPE.to_string(),
            },
            elasticsearch_cluster_config: ClusterConfig {
                instance_count: 1,
                instance_type: DEFAULT_INSTANCE_TYPE.to_string(),
            },
            snapshot_options: SnapshotOptions::default(),
        }
    }
}

impl EbsOptions {
    /// Checks whether the observed options satisfy these desired options.
    ///
    /// Size and type are only meaningful while EBS is enabled; the provider
    /// omits them otherwise.
    #[must_use]
    pub fn is_satisfied_by(&self, observed: &Self) -> bool {
        if self.ebs_enabled {
            self == observed
        } else {
            !observed.ebs_enabled
        }
    }
}
