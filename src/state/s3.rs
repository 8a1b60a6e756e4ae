//! S3-based state storage backend.
//!
//! The state and its lock live as two JSON objects under a common key
//! prefix, so that several machines can deploy the same domain.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{format_err_chain, DeployError, Result, StateError};

use super::lock::{claim, LockInfo, LockOperation, LOCK_EXPIRY_SECS};
use super::store::StateStore;
use super::types::ComponentState;

/// State object name under the prefix.
const STATE_KEY: &str = "state.json";

/// Lock object name under the prefix.
const LOCK_KEY: &str = "state.lock";

/// S3-based state store.
#[derive(Debug)]
pub struct S3StateStore {
    /// S3 client.
    client: Client,
    /// Bucket name.
    bucket: String,
    /// Key prefix, empty or ending in `/`.
    prefix: String,
}

impl S3StateStore {
    /// Creates a store using the default credential chain.
    ///
    /// # Errors
    ///
    /// Returns an error if the S3 client cannot be initialized.
    pub async fn new(bucket: &str, prefix: Option<&str>, region: Option<&str>) -> Result<Self> {
        let mut loader = aws_config::from_env();
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region.to_string()));
        }
        let config = loader.load().await;

        Ok(Self::with_client(Client::new(&config), bucket, prefix))
    }

    /// Creates a store around an existing client.
    #[must_use]
    pub fn with_client(client: Client, bucket: &str, prefix: Option<&str>) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
            prefix: prefix.map(normalize_prefix).unwrap_or_default(),
        }
    }

    fn key(&self, name: &str) -> String {
        format!("{}{name}", self.prefix)
    }

    fn url(&self, key: &str) -> String {
        format!("s3://{}/{key}", self.bucket)
    }

    /// Fetches and parses a JSON object, or `None` if the key is missing.
    async fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let key = self.key(name);

        let response = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                let err = err.into_service_error();
                if err.is_no_such_key() {
                    debug!("No object at {}", self.url(&key));
                    return Ok(None);
                }
                return Err(DeployError::State(StateError::s3(format!(
                    "Failed to read {}: {}",
                    self.url(&key),
                    format_err_chain(&err)
                ))));
            }
        };

        let bytes = response.body.collect().await.map_err(|e| {
            DeployError::State(StateError::s3(format!(
                "Failed to read body of {}: {e}",
                self.url(&key)
            )))
        })?;

        serde_json::from_slice(&bytes.into_bytes()).map(Some).map_err(|e| {
            DeployError::State(StateError::Corrupted {
                message: format!("Failed to parse {}: {e}", self.url(&key)),
            })
        })
    }

    /// Serializes and uploads a JSON object.
    async fn write_json<T: Serialize + Sync>(&self, name: &str, value: &T) -> Result<()> {
        let key = self.key(name);

        let body = serde_json::to_vec_pretty(value).map_err(|e| {
            DeployError::State(StateError::serialization(format!(
                "Failed to serialize {name}: {e}"
            )))
        })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(body))
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| {
                DeployError::State(StateError::s3(format!(
                    "Failed to write {}: {}",
                    self.url(&key),
                    format_err_chain(&e)
                )))
            })?;

        Ok(())
    }

    async fn remove_object(&self, name: &str) -> Result<()> {
        let key = self.key(name);

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| {
                DeployError::State(StateError::s3(format!(
                    "Failed to delete {}: {}",
                    self.url(&key),
                    format_err_chain(&e)
                )))
            })?;

        Ok(())
    }
}

#[async_trait]
impl StateStore for S3StateStore {
    async fn load(&self) -> Result<Option<ComponentState>> {
        let state: Option<ComponentState> = self.read_json(STATE_KEY).await?;

        if let Some(state) = &state {
            info!(
                "Loaded state for domain {} from {}",
                state.name.as_deref().unwrap_or("(not deployed)"),
                self.url(&self.key(STATE_KEY))
            );
        }

        Ok(state)
    }

    async fn save(&self, state: &ComponentState) -> Result<()> {
        info!("Saving state to {}", self.url(&self.key(STATE_KEY)));
        self.write_json(STATE_KEY, state).await
    }

    async fn delete(&self) -> Result<()> {
        info!("Deleting state at {}", self.url(&self.key(STATE_KEY)));
        self.remove_object(STATE_KEY).await
    }

    async fn exists(&self) -> Result<bool> {
        let key = self.key(STATE_KEY);

        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                let err = err.into_service_error();
                if err.is_not_found() {
                    Ok(false)
                } else {
                    Err(DeployError::State(StateError::s3(format!(
                        "Failed to check {}: {}",
                        self.url(&key),
                        format_err_chain(&err)
                    ))))
                }
            }
        }
    }

    async fn acquire_lock(&self, holder: &str, operation: LockOperation) -> Result<LockInfo> {
        let lock_info = claim(self.get_lock_info().await?, holder, operation)?;
        self.write_json(LOCK_KEY, &lock_info).await?;

        info!(
            "Acquired {operation} lock: {} (expires in {LOCK_EXPIRY_SECS}s)",
            lock_info.lock_id
        );

        Ok(lock_info)
    }

    async fn release_lock(&self, lock_id: &str) -> Result<()> {
        match self.get_lock_info().await? {
            Some(existing) if existing.lock_id == lock_id => {
                self.remove_object(LOCK_KEY).await?;
                info!("Released state lock: {lock_id}");
            }
            Some(existing) => {
                debug!(
                    "Lock ID mismatch: expected {lock_id}, found {}",
                    existing.lock_id
                );
            }
            None => {}
        }

        Ok(())
    }

    async fn get_lock_info(&self) -> Result<Option<LockInfo>> {
        self.read_json(LOCK_KEY).await
    }

    fn backend_type(&self) -> &'static str {
        "s3"
    }
}

/// Turns a user-supplied prefix into `segment/` form, or empty.
fn normalize_prefix(prefix: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        String::new()
    } else {
        format!("{prefix}/")
    }
}
