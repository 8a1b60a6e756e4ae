//! Configuration validation for domain inputs.
//!
//! This module validates the normalized domain configuration and the state
//! backend settings before any call reaches the provider.

use crate::error::{ConfigError, DeployError, Result};
use std::collections::HashSet;
use tracing::debug;

use super::spec::{DomainConfig, StateBackend, StateConfig};
use crate::planner::GENERATED_SUFFIX_LEN;

/// Maximum length of an Elasticsearch Service domain name.
pub const MAX_DOMAIN_NAME_LEN: usize = 28;

/// EBS volume types accepted by Elasticsearch Service.
const KNOWN_VOLUME_TYPES: &[&str] = &["standard", "gp2", "gp3", "io1"];

/// Validator for domain configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator {
    /// Known EBS volume types.
    known_volume_types: HashSet<String>,
}

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator with the default known volume types.
    #[must_use]
    pub fn new() -> Self {
        Self {
            known_volume_types: KNOWN_VOLUME_TYPES.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Validates a domain configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any check fails.
    pub fn validate(&self, config: &DomainConfig) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        Self::validate_identity(config, &mut result);
        self.validate_storage(config, &mut result);
        Self::validate_cluster(config, &mut result);
        Self::validate_snapshots(config, &mut result);
        Self::validate_access_policies(config, &mut result);

        result.into_checked()
    }

    /// Validates state backend configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is missing required settings.
    pub fn validate_state(&self, state: &StateConfig) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        match state.backend {
            StateBackend::S3 => {
                if state.bucket.as_ref().is_none_or(String::is_empty) {
                    result.errors.push(ValidationError {
                        field: String::from("state.bucket"),
                        message: String::from("S3 bucket name is required when using S3 backend"),
                    });
                }
            }
            StateBackend::Local => {}
        }

        result.into_checked()
    }

    fn validate_identity(config: &DomainConfig, result: &mut ValidationResult) {
        if config.region.trim().is_empty() {
            result.errors.push(ValidationError {
                field: String::from("region"),
                message: String::from("Region cannot be empty"),
            });
        }

        if let Some(name) = &config.name {
            let max_len = MAX_DOMAIN_NAME_LEN - GENERATED_SUFFIX_LEN - 1;
            if !is_valid_name(name) {
                result.errors.push(ValidationError {
                    field: String::from("name"),
                    message: format!(
                        "Name '{name}' is invalid. Must start with a lowercase letter and contain only lowercase letters, digits and hyphens."
                    ),
                });
            } else if name.len() > max_len {
                result.errors.push(ValidationError {
                    field: String::from("name"),
                    message: format!(
                        "Name '{name}' is too long: at most {max_len} characters leave room for the generated suffix"
                    ),
                });
            }
        }

        if config.elasticsearch_version.trim().is_empty() {
            result.errors.push(ValidationError {
                field: String::from("elasticsearchVersion"),
                message: String::from("Engine version cannot be empty"),
            });
        }
    }

    fn validate_storage(&self, config: &DomainConfig, result: &mut ValidationResult) {
        let ebs = &config.ebs_options;
        if !ebs.ebs_enabled {
            return;
        }

        if ebs.volume_size < 1 {
            result.errors.push(ValidationError {
                field: String::from("ebsOptions.VolumeSize"),
                message: format!("Volume size must be at least 1 GiB, got {}", ebs.volume_size),
            });
        }

        if !self.known_volume_types.contains(&ebs.volume_type) {
            result.warnings.push(format!(
                "ebsOptions.VolumeType: Unknown volume type '{}'. This may be rejected by the provider.",
                ebs.volume_type
            ));
        }
    }

    fn validate_cluster(config: &DomainConfig, result: &mut ValidationResult) {
        let cluster = &config.elasticsearch_cluster_config;

        if cluster.instance_count < 1 {
            result.errors.push(ValidationError {
                field: String::from("elasticsearchClusterConfig.InstanceCount"),
                message: format!(
                    "Instance count must be at least 1, got {}",
                    cluster.instance_count
                ),
            });
        }

        if cluster.instance_type.trim().is_empty() {
            result.errors.push(ValidationError {
                field: String::from("elasticsearchClusterConfig.InstanceType"),
                message: String::from("Instance type cannot be empty"),
            });
        } else if !cluster.instance_type.ends_with(".elasticsearch") {
            result.warnings.push(format!(
                "elasticsearchClusterConfig.InstanceType: '{}' does not look like an Elasticsearch instance type",
                cluster.instance_type
            ));
        }
    }

    fn validate_snapshots(config: &DomainConfig, result: &mut ValidationResult) {
        let hour = config.snapshot_options.automated_snapshot_start_hour;
        if !(0..=23).contains(&hour) {
            result.errors.push(ValidationError {
                field: String::from("snapshotOptions.AutomatedSnapshotStartHour"),
                message: format!("Snapshot start hour must be between 0 and 23, got {hour}"),
            });
        }
    }

    fn validate_access_policies(config: &DomainConfig, result: &mut ValidationResult) {
        if let Some(policy) = &config.access_policies
            && !policy.is_object()
        {
            result.errors.push(ValidationError {
                field: String::from("accessPolicies"),
                message: String::from("Access policy must be a JSON object"),
            });
        }
    }
}

/// Validates that a name follows the domain naming convention.
/// Names must be lowercase alphanumeric with hyphens, starting with a letter.
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();

    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {}
        _ => return false,
    }

    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn into_checked(self) -> Result<Self> {
        if let Some(first_error) = self.errors.first() {
            return Err(DeployError::Config(ConfigError::validation(
                first_error.message.clone(),
                first_error.field.clone(),
            )));
        }

        debug!("Configuration validation passed");
        Ok(self)
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
