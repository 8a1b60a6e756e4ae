//! The interface shared by state backends.

use async_trait::async_trait;

use crate::error::Result;

use super::lock::{LockInfo, LockOperation};
use super::types::ComponentState;

/// Where the deployed domain's identifiers are kept between runs.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads the recorded state, or `None` before the first deploy.
    async fn load(&self) -> Result<Option<ComponentState>>;

    /// Replaces the recorded state.
    async fn save(&self, state: &ComponentState) -> Result<()>;

    /// Forgets the recorded state. The lock is left alone.
    async fn delete(&self) -> Result<()>;

    /// Checks if any state is recorded.
    async fn exists(&self) -> Result<bool>;

    /// Takes the lock for `operation`.
    ///
    /// Fails with `StateError::LockedByOther` while another live lock exists.
    async fn acquire_lock(&self, holder: &str, operation: LockOperation) -> Result<LockInfo>;

    /// Releases the lock if `lock_id` still owns it.
    async fn release_lock(&self, lock_id: &str) -> Result<()>;

    /// Returns the current lock, expired or not.
    async fn get_lock_info(&self) -> Result<Option<LockInfo>>;

    /// Checks for a live lock.
    async fn is_locked(&self) -> Result<bool> {
        Ok(self
            .get_lock_info()
            .await?
            .is_some_and(|lock| !lock.is_expired()))
    }

    /// Loads the recorded state, or an empty one before the first deploy.
    async fn load_or_default(&self) -> Result<ComponentState> {
        Ok(self.load().await?.unwrap_or_default())
    }

    /// Short backend name for logs.
    fn backend_type(&self) -> &'static str;
}

#[async_trait]
impl StateStore for Box<dyn StateStore> {
    async fn load(&self) -> Result<Option<ComponentState>> {
        (**self).load().await
    }

    async fn save(&self, state: &ComponentState) -> Result<()> {
        (**self).save(state).await
    }

    async fn delete(&self) -> Result<()> {
        (**self).delete().await
    }

    async fn exists(&self) -> Result<bool> {
        (**self).exists().await
    }

    async fn acquire_lock(&self, holder: &str, operation: LockOperation) -> Result<LockInfo> {
        (**self).acquire_lock(holder, operation).await
    }

    async fn release_lock(&self, lock_id: &str) -> Result<()> {
        (**self).release_lock(lock_id).await
    }

    async fn get_lock_info(&self) -> Result<Option<LockInfo>> {
        (**self).get_lock_info().await
    }

    fn backend_type(&self) -> &'static str {
        (**self).backend_type()
    }
}
