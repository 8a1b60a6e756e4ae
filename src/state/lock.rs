//! State locking for concurrent access protection.
//!
//! Two invocations reconciling the same domain would both poll and mutate it
//! with nothing ordering their calls. Deploy and remove therefore hold the
//! state lock for their whole run.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DeployError, Result, StateError};

/// Lock expiry duration in seconds.
///
/// Must outlive the activation wait window, which can hold a deploy for
/// fifteen minutes per wait.
pub const LOCK_EXPIRY_SECS: i64 = 3600;

/// The operation a lock was taken for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockOperation {
    /// Creating or updating the domain.
    Deploy,
    /// Deleting the domain.
    Remove,
}

impl fmt::Display for LockOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deploy => write!(f, "deploy"),
            Self::Remove => write!(f, "remove"),
        }
    }
}

/// Information about a state lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Unique lock identifier.
    pub lock_id: String,
    /// Who holds the lock.
    pub holder: String,
    /// What the holder is doing.
    pub operation: LockOperation,
    /// When the lock was acquired.
    pub acquired_at: DateTime<Utc>,
    /// When the lock expires.
    pub expires_at: DateTime<Utc>,
}

impl LockInfo {
    /// Creates a lock for `holder` running `operation`.
    #[must_use]
    pub fn new(holder: &str, operation: LockOperation) -> Self {
        let now = Utc::now();
        Self {
            lock_id: Uuid::new_v4().to_string(),
            holder: holder.to_string(),
            operation,
            acquired_at: now,
            expires_at: now + chrono::Duration::seconds(LOCK_EXPIRY_SECS),
        }
    }

    /// Checks if the lock has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Returns the remaining time until expiry in seconds.
    #[must_use]
    pub fn remaining_secs(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds().max(0)
    }
}

/// Decides whether a new lock may replace `existing`.
///
/// A live lock held by anyone is a conflict. An expired one is taken over.
/// An empty `holder` is replaced by a generated holder id.
pub(crate) fn claim(
    existing: Option<LockInfo>,
    holder: &str,
    operation: LockOperation,
) -> Result<LockInfo> {
    if let Some(existing) = existing {
        if !existing.is_expired() {
            return Err(DeployError::State(StateError::LockedByOther {
                holder: format!("{} ({})", existing.holder, existing.operation),
                since: existing.acquired_at.to_rfc3339(),
            }));
        }
        debug!(
            "Taking over expired {} lock held by {}",
            existing.operation, existing.holder
        );
    }

    let holder = if holder.is_empty() {
        generate_holder_id()
    } else {
        holder.to_string()
    };

    Ok(LockInfo::new(&holder, operation))
}

/// Generates a unique holder identifier for the current process.
#[must_use]
pub fn generate_holder_id() -> String {
    let hostname = hostname::get()
        .map_or_else(|_| String::from("unknown"), |h| h.to_string_lossy().to_string());
    let suffix = Uuid::new_v4().simple().to_string();

    format!("{hostname}-{}-{}", std::process::id(), &suffix[..8])
}
