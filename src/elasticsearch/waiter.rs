//! Polling until a domain settles.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::{DeployError, ProviderError, Result};

use super::client::DomainApi;
use super::types::DomainStatus;

/// Default polling interval in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;

/// Default wait timeout in seconds.
pub const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 15 * 60;

/// How often and for how long to poll a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Delay between two describe calls.
    pub interval: Duration,
    /// Total time allowed before giving up.
    pub timeout: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            timeout: Duration::from_secs(DEFAULT_WAIT_TIMEOUT_SECS),
        }
    }
}

impl WaitPolicy {
    /// Creates a wait policy.
    #[must_use]
    pub const fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

/// Polls `name` until it is active.
///
/// Returns the active status, or `None` if the domain disappeared while
/// waiting.
///
/// # Errors
///
/// Returns [`ProviderError::Timeout`] once the policy's timeout has elapsed,
/// or any error from the describe call.
pub async fn wait_for_active(
    api: &dyn DomainApi,
    name: &str,
    policy: WaitPolicy,
) -> Result<Option<DomainStatus>> {
    let start = Instant::now();

    info!("Waiting for domain {name} to become active");

    loop {
        let Some(status) = api.describe_domain(name).await? else {
            debug!("Domain {name} disappeared while waiting");
            return Ok(None);
        };

        if status.is_active() {
            info!("Domain {name} is active");
            return Ok(Some(status));
        }

        let elapsed = start.elapsed();
        if elapsed >= policy.timeout {
            return Err(DeployError::Provider(ProviderError::Timeout {
                domain: name.to_string(),
                waited_secs: elapsed.as_secs(),
            }));
        }

        debug!(
            "Domain {name} not active yet (processing: {}), checking again in {:?}",
            status.processing, policy.interval
        );
        tokio::time::sleep(policy.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DomainConfig;
    use crate::testing::FakeDomainApi;
    use std::sync::atomic::Ordering;

    fn fast_policy() -> WaitPolicy {
        WaitPolicy::new(Duration::from_millis(1), Duration::from_secs(5))
    }

    #[test]
    fn test_default_policy() {
        let policy = WaitPolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(15));
        assert_eq!(policy.timeout, Duration::from_secs(900));
    }

    #[tokio::test]
    async fn test_polls_until_active() {
        let api = FakeDomainApi::new(0);
        api.seed("logs-abc12345", &DomainConfig::default(), 2);

        let status = wait_for_active(&api, "logs-abc12345", fast_policy())
            .await
            .unwrap()
            .expect("domain should exist");

        assert!(status.is_active());
        assert_eq!(api.describes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_missing_domain_returns_none() {
        let api = FakeDomainApi::new(0);

        let status = wait_for_active(&api, "logs-abc12345", fast_policy()).await.unwrap();
        assert!(status.is_none());
    }

    #[tokio::test]
    async fn test_times_out() {
        let api = FakeDomainApi::new(0);
        api.seed("logs-abc12345", &DomainConfig::default(), u32::MAX);

        let policy = WaitPolicy::new(Duration::from_millis(1), Duration::from_millis(20));
        let err = wait_for_active(&api, "logs-abc12345", policy).await.unwrap_err();

        assert!(err.is_timeout());
    }
}
