//! State types for tracking the deployed domain.
//!
//! The persisted state is deliberately small: the identifiers needed to find
//! the domain again plus the name input of the last deploy, which keeps the
//! generated domain name stable across runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::reconciler::DeployOutputs;

/// Current version of the state format.
pub const STATE_VERSION: &str = "1.0";

/// Persisted state of one deployed domain.
///
/// Keys this version does not know about are kept in `extra` and written back
/// unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ComponentState {
    /// State format version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Resolved domain name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Domain ARN.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    /// Domain endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Region hosting the domain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Name input of the last deploy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_input: Option<NameInput>,
    /// When the state was last updated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    /// Unrecognized keys, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The name input recorded for a deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameInput {
    /// The caller did not specify a name.
    Unset,
    /// The caller specified this name.
    Named(String),
}

impl ComponentState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a domain has been deployed from this state.
    #[must_use]
    pub const fn is_deployed(&self) -> bool {
        self.name.is_some()
    }

    /// Returns true if nothing is recorded at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Merges deploy outputs into the state, keeping every other key.
    pub fn record_deployment(&mut self, outputs: &DeployOutputs) {
        self.version = Some(STATE_VERSION.to_string());
        self.name = Some(outputs.name.clone());
        self.arn = Some(outputs.arn.clone());
        self.endpoint = outputs.endpoint.clone();
        self.region = Some(outputs.region.clone());
        self.last_updated = Some(Utc::now());
    }
}

impl NameInput {
    /// Builds the recorded form of a caller's name input.
    #[must_use]
    pub fn from_option(name: Option<&str>) -> Self {
        name.map_or(Self::Unset, |name| Self::Named(name.to_string()))
    }

    /// Returns the explicit name, if any.
    #[must_use]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Unset => None,
            Self::Named(name) => Some(name),
        }
    }
}

impl std::fmt::Display for NameInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unset => write!(f, "(none)"),
            Self::Named(name) => write!(f, "{name}"),
        }
    }
}
