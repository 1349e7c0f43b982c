//! Provider composition root
//!
//! Builds one service per resource, all sharing the same repository
//! implementation and poll policy.

use crate::client::ApiClient;
use crate::config::ApiConfig;
use crate::error::Result;
use landform_cloud::{
    ClusterRepository, ClusterService, DeploymentService, DeploymentStageRepository,
    DeploymentStageService, EnvironmentRepository, JobRepository, JobService,
    OrganizationRepository, OrganizationService, PollPolicy, VariableRepository,
};
use std::sync::Arc;

/// Reconciliation services wired against the platform
pub struct Provider {
    pub clusters: ClusterService,
    pub deployments: DeploymentService,
    pub jobs: JobService,
    pub deployment_stages: DeploymentStageService,
    pub organizations: OrganizationService,
}

impl Provider {
    /// Services backed by the REST API
    pub fn new(config: ApiConfig, policy: PollPolicy) -> Result<Self> {
        let client = Arc::new(ApiClient::new(config)?);
        tracing::debug!(api_url = client.base_url(), "provider configured");
        Ok(Self::with_repositories(client, policy))
    }

    /// Services backed by any implementation of every repository trait
    pub fn with_repositories<R>(repositories: Arc<R>, policy: PollPolicy) -> Self
    where
        R: ClusterRepository
            + EnvironmentRepository
            + JobRepository
            + VariableRepository
            + DeploymentStageRepository
            + OrganizationRepository
            + 'static,
    {
        Self {
            clusters: ClusterService::new(repositories.clone(), policy.clone()),
            deployments: DeploymentService::new(repositories.clone(), policy),
            jobs: JobService::new(
                repositories.clone(),
                repositories.clone(),
                repositories.clone(),
            ),
            deployment_stages: DeploymentStageService::new(repositories.clone()),
            organizations: OrganizationService::new(repositories),
        }
    }
}
