//! Reconciler for converging a domain on its desired configuration.
//!
//! A deploy describes the domain, waits out any change already in flight, and
//! then creates it, updates the fields that differ, or leaves it alone. State
//! is threaded through explicitly: callers pass the prior state in and get the
//! next state back, or use the `*_with_store` variants that load, lock and save
//! it around the run.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{set_input, ConfigValidator, DomainConfig};
use crate::elasticsearch::{
    wait_for_active, CreateDomainRequest, DomainApi, DomainConnector, DomainStatus,
    UpdateDomainRequest, WaitPolicy,
};
use crate::error::{DeployError, ProviderError, ReconcileError, Result};
use crate::planner::{DomainDiff, DomainPlan, NameResolver};
use crate::state::{generate_holder_id, ComponentState, LockInfo, LockOperation, StateStore};

/// Outputs of a successful deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployOutputs {
    /// Domain name.
    pub name: String,
    /// Domain ARN.
    pub arn: String,
    /// Domain endpoint.
    pub endpoint: Option<String>,
    /// Region hosting the domain.
    pub region: String,
}

/// Outputs of a remove. Always empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RemoveOutputs {}

/// Reconciles one domain against its desired configuration.
pub struct Reconciler<C: DomainConnector> {
    /// Builds region-scoped clients.
    connector: C,
    /// Domain name resolver.
    resolver: NameResolver,
    /// Input validator.
    validator: ConfigValidator,
    /// Polling policy for activation waits.
    wait: WaitPolicy,
}

impl<C: DomainConnector> Reconciler<C> {
    /// Creates a reconciler with the default wait policy.
    #[must_use]
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            resolver: NameResolver::new(),
            validator: ConfigValidator::new(),
            wait: WaitPolicy::default(),
        }
    }

    /// Sets the polling policy used while waiting for the domain.
    #[must_use]
    pub const fn with_wait_policy(mut self, wait: WaitPolicy) -> Self {
        self.wait = wait;
        self
    }

    /// Deploys the domain described by `inputs`.
    ///
    /// Returns the outputs and the next state; nothing is persisted.
    ///
    /// # Errors
    ///
    /// Returns an error if the inputs are invalid, a provider call fails, or
    /// the domain does not become active in time.
    pub async fn deploy(
        &self,
        inputs: &Value,
        mut state: ComponentState,
    ) -> Result<(DeployOutputs, ComponentState)> {
        let config = self.desired_config(inputs)?;
        let resolution = self.resolver.resolve(&config, &state);
        state.name_input = Some(resolution.name_input.clone());
        let name = resolution.name;

        info!("Deploying domain {name} in {}", config.region);

        let api = self.connector.connect(&config.region).await?;

        let mut observed = api.describe_domain(&name).await?;
        if observed.as_ref().is_some_and(|s| s.processing) {
            info!("Domain {name} is processing, waiting for it to settle");
            observed = wait_for_active(api.as_ref(), &name, self.wait).await?;
        }

        let active = match observed {
            None => {
                info!("Creating domain {name}");
                let request = CreateDomainRequest::new(&name, &config)?;
                api.create_domain(&request).await?;
                self.settle(api.as_ref(), &name).await?
            }
            Some(status) => {
                let diff = DomainDiff::compute(&name, &config, &status);
                if diff.is_empty() {
                    debug!("Domain {name} already matches the desired config");
                    status
                } else {
                    info!("Updating domain {name}: {}", diff.fields().join(", "));
                    let request = UpdateDomainRequest::new(&name, &config)?;
                    api.update_domain_config(&request).await?;
                    self.settle(api.as_ref(), &name).await?
                }
            }
        };

        let outputs = DeployOutputs {
            name,
            arn: active.arn,
            endpoint: active.endpoint,
            region: config.region,
        };
        state.record_deployment(&outputs);

        info!("Domain {} deployed", outputs.name);
        Ok((outputs, state))
    }

    /// Computes what a deploy would do, without mutating anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the inputs are invalid or the describe call fails.
    pub async fn plan(&self, inputs: &Value, state: &ComponentState) -> Result<DomainPlan> {
        let config = self.desired_config(inputs)?;
        let resolution = self.resolver.resolve(&config, state);

        let api = self.connector.connect(&config.region).await?;
        let observed = api.describe_domain(&resolution.name).await?;

        Ok(DomainPlan::new(&resolution, &config, observed.as_ref()))
    }

    /// Describes the domain recorded in `state`.
    ///
    /// Returns `None` if no domain is recorded or it no longer exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the describe call fails.
    pub async fn observe(&self, state: &ComponentState) -> Result<Option<DomainStatus>> {
        let Some(name) = state.name.as_deref() else {
            return Ok(None);
        };

        let config = Self::recorded_config(state)?;
        let api = self.connector.connect(&config.region).await?;
        api.describe_domain(name).await
    }

    /// Deletes the domain recorded in `state`.
    ///
    /// Does not wait for the deletion to finish. A domain that is already gone
    /// is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if a provider call fails.
    pub async fn remove(&self, state: &ComponentState) -> Result<RemoveOutputs> {
        let Some(name) = state.name.as_deref() else {
            info!("No domain recorded in state, nothing to remove");
            return Ok(RemoveOutputs {});
        };

        let config = Self::recorded_config(state)?;
        info!("Removing domain {name} from {}", config.region);

        let api = self.connector.connect(&config.region).await?;
        if api.describe_domain(name).await?.is_none() {
            info!("Domain {name} does not exist");
            return Ok(RemoveOutputs {});
        }

        match api.delete_domain(name).await {
            Ok(()) => info!("Deletion of domain {name} started"),
            Err(DeployError::Provider(ProviderError::NotFound { .. })) => {
                debug!("Domain {name} disappeared before it could be deleted");
            }
            Err(e) => return Err(e),
        }

        Ok(RemoveOutputs {})
    }

    /// Deploys under the store's lock, saving the next state on success.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is held elsewhere, the state cannot be
    /// loaded or saved, or the deploy fails.
    pub async fn deploy_with_store<S: StateStore + ?Sized>(
        &self,
        store: &S,
        inputs: &Value,
    ) -> Result<DeployOutputs> {
        let lock = store
            .acquire_lock(&generate_holder_id(), LockOperation::Deploy)
            .await?;

        let result = async {
            let state = store.load_or_default().await?;
            let (outputs, state) = self.deploy(inputs, state).await?;
            store.save(&state).await?;
            Ok::<_, DeployError>(outputs)
        }
        .await;

        release(store, &lock).await;
        result
    }

    /// Removes under the store's lock, deleting the state on success.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is held elsewhere, the state cannot be
    /// loaded or deleted, or the remove fails.
    pub async fn remove_with_store<S: StateStore + ?Sized>(&self, store: &S) -> Result<RemoveOutputs> {
        let lock = store
            .acquire_lock(&generate_holder_id(), LockOperation::Remove)
            .await?;

        let result = async {
            let state = store.load_or_default().await?;
            let outputs = self.remove(&state).await?;
            store.delete().await?;
            Ok::<_, DeployError>(outputs)
        }
        .await;

        release(store, &lock).await;
        result
    }

    /// Normalizes and validates caller inputs.
    fn desired_config(&self, inputs: &Value) -> Result<DomainConfig> {
        let config = DomainConfig::from_inputs(inputs)?;
        let validation = self.validator.validate(&config)?;
        for warning in &validation.warnings {
            warn!("{warning}");
        }
        Ok(config)
    }

    /// Rebuilds the effective configuration of a recorded domain.
    fn recorded_config(state: &ComponentState) -> Result<DomainConfig> {
        let mut inputs = Value::Object(serde_json::Map::new());
        if let Some(region) = &state.region {
            set_input(&mut inputs, "region", region.clone());
        }
        DomainConfig::from_inputs(&inputs)
    }

    /// Waits for a domain that was just mutated to become active.
    async fn settle(&self, api: &dyn DomainApi, name: &str) -> Result<DomainStatus> {
        wait_for_active(api, name, self.wait).await?.ok_or_else(|| {
            DeployError::Reconcile(ReconcileError::DomainVanished {
                name: name.to_string(),
            })
        })
    }
}

async fn release<S: StateStore + ?Sized>(store: &S, lock: &LockInfo) {
    if let Err(e) = store.release_lock(&lock.lock_id).await {
        warn!("Failed to release state lock {}: {e}", lock.lock_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_REGION;
    use crate::error::StateError;
    use crate::planner::PlanAction;
    use crate::state::{LocalStateStore, NameInput};
    use crate::testing::{status_for, FakeDomainApi, StaticConnector};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    mockall::mock! {
        Api {}

        #[async_trait]
        impl DomainApi for Api {
            async fn describe_domain(&self, name: &str) -> Result<Option<DomainStatus>>;
            async fn create_domain(&self, request: &CreateDomainRequest) -> Result<()>;
            async fn update_domain_config(&self, request: &UpdateDomainRequest) -> Result<()>;
            async fn delete_domain(&self, name: &str) -> Result<()>;
        }
    }

    fn fast_wait() -> WaitPolicy {
        WaitPolicy::new(Duration::from_millis(1), Duration::from_millis(50))
    }

    fn reconciler_with(api: Arc<FakeDomainApi>) -> Reconciler<StaticConnector> {
        Reconciler::new(StaticConnector::new(api)).with_wait_policy(fast_wait())
    }

    fn mock_reconciler(api: MockApi) -> Reconciler<StaticConnector> {
        Reconciler::new(StaticConnector::new(Arc::new(api))).with_wait_policy(fast_wait())
    }

    #[tokio::test]
    async fn test_create_path() {
        let api = Arc::new(FakeDomainApi::new(2));
        let reconciler = reconciler_with(Arc::clone(&api));

        let inputs = json!({
            "name": "logs",
            "accessPolicies": { "Version": "2012-10-17", "Statement": [] },
        });
        let (outputs, state) = reconciler
            .deploy(&inputs, ComponentState::new())
            .await
            .unwrap();

        let creates = api.creates.lock().unwrap();
        assert_eq!(creates.len(), 1);
        assert_eq!(creates[0].domain_name, outputs.name);
        let policy: Value =
            serde_json::from_str(creates[0].access_policies.as_deref().unwrap()).unwrap();
        assert_eq!(policy, json!({ "Version": "2012-10-17", "Statement": [] }));

        assert!(outputs.name.starts_with("logs-"));
        assert_eq!(outputs.region, DEFAULT_REGION);
        assert!(outputs.endpoint.is_some());
        assert!(outputs.arn.ends_with(&outputs.name));

        assert_eq!(state.name.as_deref(), Some(outputs.name.as_str()));
        assert_eq!(state.arn.as_deref(), Some(outputs.arn.as_str()));
        assert_eq!(state.name_input, Some(NameInput::Named(String::from("logs"))));
    }

    #[tokio::test]
    async fn test_second_deploy_is_idempotent() {
        let api = Arc::new(FakeDomainApi::new(1));
        let reconciler = reconciler_with(Arc::clone(&api));
        let inputs = json!({ "elasticsearchClusterConfig": { "InstanceCount": 2 } });

        let (first, state) = reconciler
            .deploy(&inputs, ComponentState::new())
            .await
            .unwrap();
        let (second, _) = reconciler.deploy(&inputs, state).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(api.creates.lock().unwrap().len(), 1);
        assert!(api.updates.lock().unwrap().is_empty());
        assert_eq!(api.mutation_count(), 1);
    }

    #[tokio::test]
    async fn test_update_path_omits_version() {
        let api = Arc::new(FakeDomainApi::new(0));
        let reconciler = reconciler_with(Arc::clone(&api));

        let (_, state) = reconciler
            .deploy(&json!({ "name": "logs" }), ComponentState::new())
            .await
            .unwrap();

        let changed = json!({
            "name": "logs",
            "elasticsearchVersion": "7.10",
            "elasticsearchClusterConfig": { "InstanceCount": 3 },
        });
        let (outputs, _) = reconciler.deploy(&changed, state).await.unwrap();

        let updates = api.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].domain_name, outputs.name);
        assert_eq!(updates[0].elasticsearch_cluster_config.instance_count, 3);

        let wire = serde_json::to_value(&updates[0]).unwrap();
        assert!(wire.get("ElasticsearchVersion").is_none());
        assert_eq!(api.creates.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_processing_domain_settles_before_diff() {
        let api = Arc::new(FakeDomainApi::new(0));
        let config = DomainConfig {
            name: Some(String::from("logs")),
            ..DomainConfig::default()
        };
        api.seed("logs-abc12345", &config, 3);

        let state = ComponentState {
            name: Some(String::from("logs-abc12345")),
            name_input: Some(NameInput::Named(String::from("logs"))),
            ..ComponentState::default()
        };
        let reconciler = reconciler_with(Arc::clone(&api));
        let (outputs, _) = reconciler
            .deploy(&json!({ "name": "logs" }), state)
            .await
            .unwrap();

        assert_eq!(outputs.name, "logs-abc12345");
        assert_eq!(api.mutation_count(), 0);
        assert!(api.describes.load(Ordering::SeqCst) >= 4);
    }

    #[tokio::test]
    async fn test_vanished_after_create() {
        let api = Arc::new(FakeDomainApi::vanishing());
        let reconciler = reconciler_with(Arc::clone(&api));

        let result = reconciler.deploy(&json!({}), ComponentState::new()).await;

        assert!(matches!(
            result,
            Err(DeployError::Reconcile(ReconcileError::DomainVanished { .. }))
        ));
    }

    #[tokio::test]
    async fn test_invalid_inputs_make_no_calls() {
        let api = Arc::new(FakeDomainApi::new(0));
        let connector = StaticConnector::new(Arc::clone(&api) as Arc<dyn DomainApi>);
        let reconciler = Reconciler::new(connector);

        let result = reconciler
            .deploy(
                &json!({ "snapshotOptions": { "AutomatedSnapshotStartHour": 30 } }),
                ComponentState::new(),
            )
            .await;

        assert!(matches!(result, Err(DeployError::Config(_))));
        assert!(reconciler.connector.regions.lock().unwrap().is_empty());
        assert_eq!(api.describes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_deploy_connects_to_requested_region() {
        let api = Arc::new(FakeDomainApi::new(0));
        let reconciler = reconciler_with(Arc::clone(&api));

        let (outputs, state) = reconciler
            .deploy(&json!({ "region": "eu-west-1" }), ComponentState::new())
            .await
            .unwrap();

        assert_eq!(outputs.region, "eu-west-1");
        assert_eq!(state.region.as_deref(), Some("eu-west-1"));
        assert_eq!(
            *reconciler.connector.regions.lock().unwrap(),
            vec![String::from("eu-west-1")]
        );
    }

    #[tokio::test]
    async fn test_timeout_is_fatal_without_mutation() {
        let mut api = MockApi::new();
        api.expect_describe_domain().returning(|name| {
            Ok(Some(status_for(name, &DomainConfig::default())))
        });
        api.expect_create_domain().never();
        api.expect_update_domain_config().never();
        api.expect_delete_domain().never();

        let state = ComponentState {
            name: Some(String::from("es-0123456789ab")),
            name_input: Some(NameInput::Unset),
            ..ComponentState::default()
        };
        let result = mock_reconciler(api).deploy(&json!({}), state).await;

        assert!(result.is_err_and(|e| e.is_timeout()));
    }

    #[tokio::test]
    async fn test_provider_errors_propagate() {
        let mut api = MockApi::new();
        api.expect_describe_domain()
            .times(1)
            .returning(|_| {
                Err(DeployError::Provider(ProviderError::api(
                    "DescribeElasticsearchDomain",
                    "throttled",
                )))
            });
        api.expect_create_domain().never();

        let result = mock_reconciler(api)
            .deploy(&json!({}), ComponentState::new())
            .await;

        assert!(matches!(
            result,
            Err(DeployError::Provider(ProviderError::Api { .. }))
        ));
    }

    #[tokio::test]
    async fn test_remove_absent_domain() {
        let mut api = MockApi::new();
        api.expect_describe_domain()
            .withf(|name| name == "logs-abc12345")
            .times(1)
            .returning(|_| Ok(None));
        api.expect_delete_domain().never();

        let state = ComponentState {
            name: Some(String::from("logs-abc12345")),
            ..ComponentState::default()
        };
        let outputs = mock_reconciler(api).remove(&state).await.unwrap();

        assert_eq!(serde_json::to_value(outputs).unwrap(), json!({}));
    }

    #[tokio::test]
    async fn test_remove_without_state_makes_no_calls() {
        let mut api = MockApi::new();
        api.expect_describe_domain().never();
        api.expect_delete_domain().never();

        mock_reconciler(api)
            .remove(&ComponentState::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_remove_deletes_without_waiting() {
        let api = Arc::new(FakeDomainApi::new(0));
        let reconciler = reconciler_with(Arc::clone(&api));
        let (outputs, state) = reconciler
            .deploy(&json!({}), ComponentState::new())
            .await
            .unwrap();
        let describes_before = api.describes.load(Ordering::SeqCst);

        reconciler.remove(&state).await.unwrap();

        assert_eq!(*api.deletes.lock().unwrap(), vec![outputs.name.clone()]);
        assert!(!api.exists(&outputs.name));
        assert_eq!(api.describes.load(Ordering::SeqCst), describes_before + 1);
    }

    #[tokio::test]
    async fn test_plan_reports_without_mutating() {
        let api = Arc::new(FakeDomainApi::new(0));
        let reconciler = reconciler_with(Arc::clone(&api));

        let plan = reconciler
            .plan(&json!({ "name": "logs" }), &ComponentState::new())
            .await
            .unwrap();
        assert_eq!(plan.action, PlanAction::Create);

        let (_, state) = reconciler
            .deploy(&json!({ "name": "logs" }), ComponentState::new())
            .await
            .unwrap();
        let plan = reconciler
            .plan(&json!({ "name": "logs", "ebsOptions": { "VolumeSize": 20 } }), &state)
            .await
            .unwrap();

        assert_eq!(plan.action, PlanAction::Update);
        assert_eq!(plan.changes[0].field, "ebsOptions");
        assert_eq!(api.mutation_count(), 1);

        let observed = reconciler.observe(&state).await.unwrap();
        assert_eq!(observed.map(|s| s.name), state.name);
    }

    #[tokio::test]
    async fn test_store_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = LocalStateStore::with_base_dir(temp.path());
        let api = Arc::new(FakeDomainApi::new(1));
        let reconciler = reconciler_with(Arc::clone(&api));

        let outputs = reconciler
            .deploy_with_store(&store, &json!({ "name": "logs" }))
            .await
            .unwrap();

        let saved = store.load().await.unwrap().unwrap();
        assert_eq!(saved.name.as_deref(), Some(outputs.name.as_str()));
        assert!(!store.is_locked().await.unwrap());

        let again = reconciler
            .deploy_with_store(&store, &json!({ "name": "logs" }))
            .await
            .unwrap();
        assert_eq!(again.name, outputs.name);
        assert_eq!(api.mutation_count(), 1);

        reconciler.remove_with_store(&store).await.unwrap();
        assert!(!store.exists().await.unwrap());
        assert!(!api.exists(&outputs.name));
        assert!(!store.is_locked().await.unwrap());
    }

    #[tokio::test]
    async fn test_timeout_does_not_save_state() {
        let temp = TempDir::new().unwrap();
        let store = LocalStateStore::with_base_dir(temp.path());
        let api = Arc::new(FakeDomainApi::new(u32::MAX));
        let reconciler = reconciler_with(Arc::clone(&api));

        let result = reconciler
            .deploy_with_store(&store, &json!({ "name": "logs" }))
            .await;

        assert!(result.is_err_and(|e| e.is_timeout()));
        assert_eq!(api.creates.lock().unwrap().len(), 1);
        assert!(store.load().await.unwrap().is_none());
        assert!(!store.is_locked().await.unwrap());
    }

    #[tokio::test]
    async fn test_locked_store_blocks_deploy() {
        let temp = TempDir::new().unwrap();
        let store = LocalStateStore::with_base_dir(temp.path());
        store
            .acquire_lock("other-deployer", LockOperation::Remove)
            .await
            .unwrap();

        let api = Arc::new(FakeDomainApi::new(0));
        let reconciler = reconciler_with(Arc::clone(&api));
        let result = reconciler
            .deploy_with_store(&store, &json!({}))
            .await;

        assert!(matches!(
            result,
            Err(DeployError::State(StateError::LockedByOther { .. }))
        ));
        assert_eq!(api.describes.load(Ordering::SeqCst), 0);
        assert!(store.is_locked().await.unwrap());
    }
}
