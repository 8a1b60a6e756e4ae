//! Error types for the domain deployment system.
//!
//! This module provides the error hierarchy for every stage of a deployment:
//! configuration, state persistence, the Elasticsearch Service control plane,
//! and reconciliation.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the domain deployment system.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// State management errors.
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Elasticsearch Service API errors.
    #[error("Elasticsearch Service error: {0}")]
    Provider(#[from] ProviderError),

    /// Reconciliation errors.
    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// The normalized inputs do not describe a domain.
    #[error("Invalid domain inputs: {message}")]
    InvalidInputs {
        /// Description of the shape mismatch.
        message: String,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },
}

/// State management errors.
#[derive(Debug, Error)]
pub enum StateError {
    /// State is corrupted.
    #[error("State is corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// State lock acquisition failed.
    #[error("Failed to acquire state lock: {message}")]
    LockFailed {
        /// Description of the lock failure.
        message: String,
    },

    /// State lock is held by another process.
    #[error("State is locked by another process (lock holder: {holder}, since: {since})")]
    LockedByOther {
        /// Identifier of the lock holder.
        holder: String,
        /// When the lock was acquired.
        since: String,
    },

    /// Local filesystem backend error.
    #[error("Local state backend error: {message}")]
    LocalError {
        /// Description of the filesystem error.
        message: String,
    },

    /// S3 backend error.
    #[error("S3 state backend error: {message}")]
    S3Error {
        /// Description of the S3 error.
        message: String,
    },

    /// Serialization error.
    #[error("State serialization error: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },
}

/// Elasticsearch Service control-plane errors.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The domain does not exist.
    ///
    /// Lookup sites convert this into an absent domain; it only surfaces from
    /// operations that require the domain to exist.
    #[error("Domain not found: {domain}")]
    NotFound {
        /// Name of the missing domain.
        domain: String,
    },

    /// A control-plane call failed.
    #[error("{operation} failed: {message}")]
    Api {
        /// The API operation that failed.
        operation: String,
        /// Error message including the full source chain.
        message: String,
    },

    /// The provider answered with something we cannot interpret.
    #[error("Invalid response from Elasticsearch Service: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },

    /// Timeout waiting for the domain to become active.
    #[error("Timeout waiting for domain {domain} to become active (waited {waited_secs}s)")]
    Timeout {
        /// Name of the domain.
        domain: String,
        /// Seconds spent waiting.
        waited_secs: u64,
    },
}

/// Reconciliation errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The domain disappeared after a create or update was issued.
    #[error("Domain {name} disappeared while waiting for it to become active")]
    DomainVanished {
        /// Name of the domain.
        name: String,
    },
}

/// Result type alias for deployment operations.
pub type Result<T> = std::result::Result<T, DeployError>;

impl DeployError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error is the poll timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Provider(ProviderError::Timeout { .. }))
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl StateError {
    /// Creates an S3 error with the given message.
    #[must_use]
    pub fn s3(message: impl Into<String>) -> Self {
        Self::S3Error {
            message: message.into(),
        }
    }

    /// Creates a local filesystem error with the given message.
    #[must_use]
    pub fn local(message: impl Into<String>) -> Self {
        Self::LocalError {
            message: message.into(),
        }
    }

    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }
}

impl ProviderError {
    /// Creates an API error for the given operation.
    #[must_use]
    pub fn api(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Walks the full error chain and joins all causes into one string.
///
/// AWS SDK errors often have terse `Display` impls ("service error") with the
/// useful detail further down the source chain.
#[must_use]
pub fn format_err_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
