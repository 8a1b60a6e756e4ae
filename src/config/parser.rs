//! Configuration parser for loading deployment files.
//!
//! This module handles loading the deployment file from YAML (JSON is
//! accepted as YAML) and applying environment variable overrides, with
//! proper precedence and error handling.

use crate::error::{ConfigError, DeployError, Result};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

use super::spec::DeploymentFile;

/// Configuration parser for loading deployment files.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<std::path::PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads a deployment file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<DeploymentFile> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(DeployError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            DeployError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses a deployment file from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<DeploymentFile> {
        debug!("Parsing YAML configuration");

        let file: DeploymentFile = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            DeployError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!("Parsed deployment file with {:?} state backend", file.state.backend);
        Ok(file)
    }

    /// Loads a deployment file with environment variable overrides.
    ///
    /// Environment variables are checked in the format `ESDEPLOY_<KEY>`
    /// (e.g., `ESDEPLOY_REGION`).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<DeploymentFile> {
        let mut file = self.load_file(path)?;

        Self::apply_env_overrides(&mut file);

        Ok(file)
    }

    /// Applies environment variable overrides to the deployment file.
    fn apply_env_overrides(file: &mut DeploymentFile) {
        if let Ok(region) = std::env::var("ESDEPLOY_REGION") {
            debug!("Overriding inputs.region from environment");
            set_input(&mut file.inputs, "region", region);
        }

        if let Ok(name) = std::env::var("ESDEPLOY_NAME") {
            debug!("Overriding inputs.name from environment");
            set_input(&mut file.inputs, "name", name);
        }

        if let Ok(bucket) = std::env::var("ESDEPLOY_STATE_BUCKET") {
            debug!("Overriding state.bucket from environment");
            file.state.bucket = Some(bucket);
        }

        if let Ok(prefix) = std::env::var("ESDEPLOY_STATE_PREFIX") {
            debug!("Overriding state.prefix from environment");
            file.state.prefix = Some(prefix);
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| std::path::PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                DeployError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Sets a top-level input key, turning a missing inputs block into an object.
pub fn set_input(inputs: &mut Value, key: &str, value: impl Into<Value>) {
    if !inputs.is_object() {
        *inputs = Value::Object(serde_json::Map::new());
    }
    inputs[key] = value.into();
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &[
    "es-domain.yaml",
    "es-domain.yml",
    "serverless.yml",
    "serverless.yaml",
];

/// Finds the configuration file in the given directory or its parents.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<std::path::PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(DeployError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}
