//! Elasticsearch Service control-plane client.
//!
//! [`DomainApi`] is the seam the reconciler talks to. [`AwsDomainClient`]
//! implements it on top of `aws-sdk-elasticsearch`, and [`DomainConnector`]
//! builds a region-scoped client per invocation.

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_elasticsearch::types::{
    EbsOptions as SdkEbsOptions, ElasticsearchClusterConfig, ElasticsearchDomainStatus,
    EsPartitionInstanceType, SnapshotOptions as SdkSnapshotOptions, VolumeType,
};
use aws_sdk_elasticsearch::Client;
use tracing::{debug, trace};

use crate::config::{ClusterConfig, EbsOptions, SnapshotOptions};
use crate::error::{format_err_chain, DeployError, ProviderError, Result};

use super::types::{parse_access_policies, CreateDomainRequest, DomainStatus, UpdateDomainRequest};

/// Control-plane operations needed to reconcile one domain.
#[async_trait]
pub trait DomainApi: Send + Sync {
    /// Describes a domain by name.
    ///
    /// Returns `None` if the domain does not exist.
    async fn describe_domain(&self, name: &str) -> Result<Option<DomainStatus>>;

    /// Creates a domain.
    async fn create_domain(&self, request: &CreateDomainRequest) -> Result<()>;

    /// Updates a domain's configuration.
    async fn update_domain_config(&self, request: &UpdateDomainRequest) -> Result<()>;

    /// Deletes a domain.
    ///
    /// Fails with [`ProviderError::NotFound`] if the domain does not exist.
    async fn delete_domain(&self, name: &str) -> Result<()>;
}

/// Builds region-scoped [`DomainApi`] clients.
#[async_trait]
pub trait DomainConnector: Send + Sync {
    /// Connects to the control plane of `region`.
    async fn connect(&self, region: &str) -> Result<Arc<dyn DomainApi>>;
}

/// [`DomainApi`] backed by the AWS SDK.
#[derive(Debug, Clone)]
pub struct AwsDomainClient {
    /// SDK client.
    client: Client,
}

/// Connector resolving credentials through the AWS default provider chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct AwsConnector;

impl AwsDomainClient {
    /// Wraps an existing SDK client.
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }

    /// Creates a client for `region` using the default credential chain.
    pub async fn from_env(region: &str) -> Self {
        let config = aws_config::from_env()
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;

        Self::new(Client::new(&config))
    }
}

#[async_trait]
impl DomainApi for AwsDomainClient {
    async fn describe_domain(&self, name: &str) -> Result<Option<DomainStatus>> {
        trace!("DescribeElasticsearchDomain {name}");

        let result = self
            .client
            .describe_elasticsearch_domain()
            .domain_name(name)
            .send()
            .await;

        match result {
            Ok(output) => {
                let status = output.domain_status().ok_or_else(|| {
                    DeployError::Provider(ProviderError::InvalidResponse {
                        message: format!("DescribeElasticsearchDomain returned no status for {name}"),
                    })
                })?;
                convert_status(status).map(Some)
            }
            Err(e) => {
                if e.as_service_error()
                    .is_some_and(|se| se.is_resource_not_found_exception())
                {
                    debug!("Domain {name} does not exist");
                    Ok(None)
                } else {
                    Err(api_error("DescribeElasticsearchDomain", &e))
                }
            }
        }
    }

    async fn create_domain(&self, request: &CreateDomainRequest) -> Result<()> {
        debug!("CreateElasticsearchDomain {}", request.domain_name);

        self.client
            .create_elasticsearch_domain()
            .domain_name(&request.domain_name)
            .elasticsearch_version(&request.elasticsearch_version)
            .set_access_policies(request.access_policies.clone())
            .ebs_options(to_sdk_ebs(&request.ebs_options))
            .elasticsearch_cluster_config(to_sdk_cluster(&request.elasticsearch_cluster_config))
            .snapshot_options(to_sdk_snapshot(request.snapshot_options))
            .send()
            .await
            .map_err(|e| api_error("CreateElasticsearchDomain", &e))?;

        Ok(())
    }

    async fn update_domain_config(&self, request: &UpdateDomainRequest) -> Result<()> {
        debug!("UpdateElasticsearchDomainConfig {}", request.domain_name);

        self.client
            .update_elasticsearch_domain_config()
            .domain_name(&request.domain_name)
            .set_access_policies(request.access_policies.clone())
            .ebs_options(to_sdk_ebs(&request.ebs_options))
            .elasticsearch_cluster_config(to_sdk_cluster(&request.elasticsearch_cluster_config))
            .snapshot_options(to_sdk_snapshot(request.snapshot_options))
            .send()
            .await
            .map_err(|e| api_error("UpdateElasticsearchDomainConfig", &e))?;

        Ok(())
    }

    async fn delete_domain(&self, name: &str) -> Result<()> {
        debug!("DeleteElasticsearchDomain {name}");

        let result = self
            .client
            .delete_elasticsearch_domain()
            .domain_name(name)
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                if e.as_service_error()
                    .is_some_and(|se| se.is_resource_not_found_exception())
                {
                    Err(DeployError::Provider(ProviderError::NotFound {
                        domain: name.to_string(),
                    }))
                } else {
                    Err(api_error("DeleteElasticsearchDomain", &e))
                }
            }
        }
    }
}

#[async_trait]
impl DomainConnector for AwsConnector {
    async fn connect(&self, region: &str) -> Result<Arc<dyn DomainApi>> {
        debug!("Connecting to Elasticsearch Service in {region}");
        Ok(Arc::new(AwsDomainClient::from_env(region).await))
    }
}

/// Flattens an SDK error and its source chain into an API error.
fn api_error(operation: &str, err: &dyn std::error::Error) -> DeployError {
    DeployError::Provider(ProviderError::api(operation, format_err_chain(err)))
}

/// Converts the SDK's domain status into [`DomainStatus`].
fn convert_status(status: &ElasticsearchDomainStatus) -> Result<DomainStatus> {
    let endpoint = status
        .endpoint()
        .map(str::to_string)
        .or_else(|| status.endpoints().and_then(|m| m.get("vpc")).cloned());

    let cluster_config = status
        .elasticsearch_cluster_config()
        .map(|c| ClusterConfig {
            instance_count: c.instance_count().unwrap_or_default(),
            instance_type: c
                .instance_type()
                .map(|t| t.as_str().to_string())
                .unwrap_or_default(),
        })
        .unwrap_or_default();

    let ebs_options = status
        .ebs_options()
        .map(|e| EbsOptions {
            ebs_enabled: e.ebs_enabled().unwrap_or_default(),
            volume_size: e.volume_size().unwrap_or_default(),
            volume_type: e
                .volume_type()
                .map(|t| t.as_str().to_string())
                .unwrap_or_default(),
        })
        .unwrap_or_default();

    let snapshot_options = status
        .snapshot_options()
        .map(|s| SnapshotOptions {
            automated_snapshot_start_hour: s.automated_snapshot_start_hour().unwrap_or_default(),
        })
        .unwrap_or_default();

    Ok(DomainStatus {
        id: status.domain_id().to_string(),
        arn: status.arn().to_string(),
        name: status.domain_name().to_string(),
        endpoint,
        processing: status.processing().unwrap_or_default()
            || status.upgrade_processing().unwrap_or_default(),
        elasticsearch_version: status.elasticsearch_version().map(str::to_string),
        cluster_config,
        ebs_options,
        snapshot_options,
        access_policies: parse_access_policies(status.access_policies())?,
    })
}

fn to_sdk_ebs(ebs: &EbsOptions) -> SdkEbsOptions {
    let builder = SdkEbsOptions::builder().ebs_enabled(ebs.ebs_enabled);
    if ebs.ebs_enabled {
        builder
            .volume_size(ebs.volume_size)
            .volume_type(VolumeType::from(ebs.volume_type.as_str()))
            .build()
    } else {
        builder.build()
    }
}

fn to_sdk_cluster(cluster: &ClusterConfig) -> ElasticsearchClusterConfig {
    ElasticsearchClusterConfig::builder()
        .instance_count(cluster.instance_count)
        .instance_type(EsPartitionInstanceType::from(cluster.instance_type.as_str()))
        .build()
}

fn to_sdk_snapshot(snapshot: SnapshotOptions) -> SdkSnapshotOptions {
    SdkSnapshotOptions::builder()
        .automated_snapshot_start_hour(snapshot.automated_snapshot_start_hour)
        .build()
}
