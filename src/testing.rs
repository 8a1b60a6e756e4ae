//! In-memory control plane for reconciliation tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::config::DomainConfig;
use crate::elasticsearch::{
    parse_access_policies, CreateDomainRequest, DomainApi, DomainConnector, DomainStatus,
    UpdateDomainRequest,
};
use crate::error::{DeployError, ProviderError, Result};

/// A remote domain plus the number of describes left before it settles.
struct FakeDomain {
    status: DomainStatus,
    polls_until_active: u32,
}

/// Stateful fake of the control plane.
///
/// Mutations put the domain into processing for `settle_after` describes.
#[derive(Default)]
pub(crate) struct FakeDomainApi {
    domains: Mutex<HashMap<String, FakeDomain>>,
    settle_after: u32,
    vanish_after_mutation: bool,
    pub(crate) describes: AtomicUsize,
    pub(crate) creates: Mutex<Vec<CreateDomainRequest>>,
    pub(crate) updates: Mutex<Vec<UpdateDomainRequest>>,
    pub(crate) deletes: Mutex<Vec<String>>,
}

impl FakeDomainApi {
    pub(crate) fn new(settle_after: u32) -> Self {
        Self {
            settle_after,
            ..Self::default()
        }
    }

    /// Makes the domain disappear as soon as it is mutated.
    pub(crate) fn vanishing() -> Self {
        Self {
            vanish_after_mutation: true,
            ..Self::default()
        }
    }

    /// Seeds an existing domain, processing for `polls_until_active` describes.
    pub(crate) fn seed(&self, name: &str, config: &DomainConfig, polls_until_active: u32) {
        let mut status = status_for(name, config);
        status.processing = polls_until_active > 0;
        if polls_until_active == 0 {
            status.endpoint = Some(endpoint_for(name));
        }
        self.domains.lock().unwrap().insert(
            name.to_string(),
            FakeDomain {
                status,
                polls_until_active,
            },
        );
    }

    pub(crate) fn mutation_count(&self) -> usize {
        self.creates.lock().unwrap().len()
            + self.updates.lock().unwrap().len()
            + self.deletes.lock().unwrap().len()
    }

    pub(crate) fn exists(&self, name: &str) -> bool {
        self.domains.lock().unwrap().contains_key(name)
    }

    fn start_processing(&self, name: &str) {
        let mut domains = self.domains.lock().unwrap();
        if self.vanish_after_mutation {
            domains.remove(name);
        } else if let Some(domain) = domains.get_mut(name) {
            domain.status.processing = true;
            domain.polls_until_active = self.settle_after;
        }
    }
}

#[async_trait]
impl DomainApi for FakeDomainApi {
    async fn describe_domain(&self, name: &str) -> Result<Option<DomainStatus>> {
        self.describes.fetch_add(1, Ordering::SeqCst);

        let mut domains = self.domains.lock().unwrap();
        let Some(domain) = domains.get_mut(name) else {
            return Ok(None);
        };

        if domain.polls_until_active == 0 {
            domain.status.processing = false;
            domain.status.endpoint = Some(endpoint_for(name));
        } else {
            domain.polls_until_active -= 1;
        }

        Ok(Some(domain.status.clone()))
    }

    async fn create_domain(&self, request: &CreateDomainRequest) -> Result<()> {
        self.creates.lock().unwrap().push(request.clone());

        let config = DomainConfig {
            elasticsearch_version: request.elasticsearch_version.clone(),
            access_policies: parse_access_policies(request.access_policies.as_deref())?,
            ebs_options: request.ebs_options.clone(),
            elasticsearch_cluster_config: request.elasticsearch_cluster_config.clone(),
            snapshot_options: request.snapshot_options,
            ..DomainConfig::default()
        };
        self.domains.lock().unwrap().insert(
            request.domain_name.clone(),
            FakeDomain {
                status: status_for(&request.domain_name, &config),
                polls_until_active: 0,
            },
        );
        self.start_processing(&request.domain_name);
        Ok(())
    }

    async fn update_domain_config(&self, request: &UpdateDomainRequest) -> Result<()> {
        self.updates.lock().unwrap().push(request.clone());

        {
            let mut domains = self.domains.lock().unwrap();
            let Some(domain) = domains.get_mut(&request.domain_name) else {
                return Err(DeployError::Provider(ProviderError::NotFound {
                    domain: request.domain_name.clone(),
                }));
            };
            let status = &mut domain.status;
            if let Some(policy) = parse_access_policies(request.access_policies.as_deref())? {
                status.access_policies = Some(policy);
            }
            status.ebs_options = request.ebs_options.clone();
            status.cluster_config = request.elasticsearch_cluster_config.clone();
            status.snapshot_options = request.snapshot_options;
        }

        self.start_processing(&request.domain_name);
        Ok(())
    }

    async fn delete_domain(&self, name: &str) -> Result<()> {
        self.deletes.lock().unwrap().push(name.to_string());

        if self.domains.lock().unwrap().remove(name).is_none() {
            return Err(DeployError::Provider(ProviderError::NotFound {
                domain: name.to_string(),
            }));
        }
        Ok(())
    }
}

/// Connector handing out one shared API regardless of region.
pub(crate) struct StaticConnector {
    api: Arc<dyn DomainApi>,
    pub(crate) regions: Mutex<Vec<String>>,
}

impl StaticConnector {
    pub(crate) fn new(api: Arc<dyn DomainApi>) -> Self {
        Self {
            api,
            regions: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl DomainConnector for StaticConnector {
    async fn connect(&self, region: &str) -> Result<Arc<dyn DomainApi>> {
        self.regions.lock().unwrap().push(region.to_string());
        Ok(Arc::clone(&self.api))
    }
}

/// Builds the status a domain created from `config` would report.
pub(crate) fn status_for(name: &str, config: &DomainConfig) -> DomainStatus {
    DomainStatus {
        id: format!("123456789012/{name}"),
        arn: format!("arn:aws:es:{}:123456789012:domain/{name}", config.region),
        name: name.to_string(),
        endpoint: None,
        processing: true,
        elasticsearch_version: Some(config.elasticsearch_version.clone()),
        cluster_config: config.elasticsearch_cluster_config.clone(),
        ebs_options: config.ebs_options.clone(),
        snapshot_options: config.snapshot_options,
        access_policies: config.access_policies.clone(),
    }
}

fn endpoint_for(name: &str) -> String {
    format!("search-{name}.us-east-1.es.amazonaws.com")
}
