//! Configuration module for the domain deployment system.
//!
//! This module handles all configuration-related functionality:
//! - Parsing the deployment file and applying environment overrides
//! - Merging caller inputs over defaults and normalizing them
//! - Validation of domain and state backend settings

mod spec;
mod normalize;
mod parser;
mod validator;

pub use spec::{
    default_inputs, ClusterConfig, DeploymentFile, DomainConfig, EbsOptions, SnapshotOptions,
    StateBackend, StateConfig, DEFAULT_ELASTICSEARCH_VERSION, DEFAULT_INSTANCE_TYPE,
    DEFAULT_REGION, DEFAULT_VOLUME_SIZE, DEFAULT_VOLUME_TYPE,
};
pub use normalize::{merge, normalize};
pub use parser::{find_config_file, set_input, ConfigParser, DEFAULT_CONFIG_FILES};
pub use validator::{ConfigValidator, ValidationError, ValidationResult, MAX_DOMAIN_NAME_LEN};
