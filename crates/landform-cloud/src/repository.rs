//! Repository traits
//!
//! One trait per remote resource. The REST adapter implements them against
//! the platform API and the `testing` module implements them in memory.
//! Every method takes the [`Context`] of the reconciliation it belongs to and
//! reports failures as [`ApiError`](crate::error::ApiError)s scoped to the
//! operation, so a status code (or its absence) is always visible.

use crate::context::Context;
use crate::error::Result;
use crate::model::{
    AdvancedSettings, CloudProviderInfo, Cluster, ClusterRequest, DeploymentStage,
    DeploymentStageRequest, Job, JobUpsertRequest, Organization, OrganizationParams,
    RoutingTable, Variable, VariableKind, VariableUpsert,
};
use crate::state::State;
use async_trait::async_trait;

/// Clusters, addressed within their organization
///
/// Cluster bodies come back without sub-resources; the cloud-provider info,
/// routing table and advanced settings have their own calls.
#[async_trait]
pub trait ClusterRepository: Send + Sync {
    async fn create(
        &self,
        ctx: &Context,
        organization_id: &str,
        request: &ClusterRequest,
    ) -> Result<Cluster>;

    /// Not-found when the cluster is absent from the organization
    async fn get(&self, ctx: &Context, organization_id: &str, cluster_id: &str)
    -> Result<Cluster>;

    async fn update(
        &self,
        ctx: &Context,
        organization_id: &str,
        cluster_id: &str,
        request: &ClusterRequest,
    ) -> Result<Cluster>;

    async fn delete(&self, ctx: &Context, organization_id: &str, cluster_id: &str) -> Result<()>;

    async fn get_status(
        &self,
        ctx: &Context,
        organization_id: &str,
        cluster_id: &str,
    ) -> Result<State>;

    async fn deploy(&self, ctx: &Context, organization_id: &str, cluster_id: &str) -> Result<()>;

    async fn stop(&self, ctx: &Context, organization_id: &str, cluster_id: &str) -> Result<()>;

    /// Re-apply the infrastructure of a deployed cluster
    async fn apply_update(
        &self,
        ctx: &Context,
        organization_id: &str,
        cluster_id: &str,
    ) -> Result<()>;

    async fn get_cloud_provider_info(
        &self,
        ctx: &Context,
        organization_id: &str,
        cluster_id: &str,
    ) -> Result<CloudProviderInfo>;

    async fn specify_cloud_provider_info(
        &self,
        ctx: &Context,
        organization_id: &str,
        cluster_id: &str,
        info: &CloudProviderInfo,
    ) -> Result<()>;

    async fn get_routing_table(
        &self,
        ctx: &Context,
        organization_id: &str,
        cluster_id: &str,
    ) -> Result<RoutingTable>;

    async fn edit_routing_table(
        &self,
        ctx: &Context,
        organization_id: &str,
        cluster_id: &str,
        table: &RoutingTable,
    ) -> Result<RoutingTable>;

    async fn get_advanced_settings(
        &self,
        ctx: &Context,
        organization_id: &str,
        cluster_id: &str,
    ) -> Result<AdvancedSettings>;

    async fn edit_advanced_settings(
        &self,
        ctx: &Context,
        organization_id: &str,
        cluster_id: &str,
        settings: &AdvancedSettings,
    ) -> Result<AdvancedSettings>;
}

/// Lifecycle calls against an environment
#[async_trait]
pub trait EnvironmentRepository: Send + Sync {
    async fn get_status(&self, ctx: &Context, environment_id: &str) -> Result<State>;

    async fn deploy(&self, ctx: &Context, environment_id: &str) -> Result<()>;

    async fn redeploy(&self, ctx: &Context, environment_id: &str) -> Result<()>;

    async fn stop(&self, ctx: &Context, environment_id: &str) -> Result<()>;

    async fn restart(&self, ctx: &Context, environment_id: &str) -> Result<()>;

    async fn delete(&self, ctx: &Context, environment_id: &str) -> Result<()>;
}

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn create(
        &self,
        ctx: &Context,
        environment_id: &str,
        request: &JobUpsertRequest,
    ) -> Result<Job>;

    async fn get(&self, ctx: &Context, job_id: &str) -> Result<Job>;

    async fn update(&self, ctx: &Context, job_id: &str, request: &JobUpsertRequest)
    -> Result<Job>;

    async fn delete(&self, ctx: &Context, job_id: &str) -> Result<()>;
}

/// Environment variables and secrets of a service
#[async_trait]
pub trait VariableRepository: Send + Sync {
    async fn list(&self, ctx: &Context, kind: VariableKind, service_id: &str)
    -> Result<Vec<Variable>>;

    async fn create(
        &self,
        ctx: &Context,
        kind: VariableKind,
        service_id: &str,
        request: &VariableUpsert,
    ) -> Result<Variable>;

    async fn update(
        &self,
        ctx: &Context,
        kind: VariableKind,
        service_id: &str,
        variable_id: &str,
        request: &VariableUpsert,
    ) -> Result<Variable>;

    async fn delete(
        &self,
        ctx: &Context,
        kind: VariableKind,
        service_id: &str,
        variable_id: &str,
    ) -> Result<()>;
}

#[async_trait]
pub trait DeploymentStageRepository: Send + Sync {
    async fn create(
        &self,
        ctx: &Context,
        environment_id: &str,
        request: &DeploymentStageRequest,
    ) -> Result<DeploymentStage>;

    async fn get(&self, ctx: &Context, stage_id: &str) -> Result<DeploymentStage>;

    async fn update(
        &self,
        ctx: &Context,
        stage_id: &str,
        request: &DeploymentStageRequest,
    ) -> Result<DeploymentStage>;

    async fn delete(&self, ctx: &Context, stage_id: &str) -> Result<()>;

    async fn move_after(
        &self,
        ctx: &Context,
        stage_id: &str,
        after_stage_id: &str,
    ) -> Result<DeploymentStage>;

    async fn move_before(
        &self,
        ctx: &Context,
        stage_id: &str,
        before_stage_id: &str,
    ) -> Result<DeploymentStage>;

    /// Assign a service (job, application, ...) to a stage
    async fn attach_service(&self, ctx: &Context, stage_id: &str, service_id: &str)
    -> Result<()>;

    /// Stage a service currently belongs to
    async fn get_service_stage(&self, ctx: &Context, service_id: &str)
    -> Result<DeploymentStage>;
}

#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    async fn get(&self, ctx: &Context, organization_id: &str) -> Result<Organization>;

    async fn update(
        &self,
        ctx: &Context,
        organization_id: &str,
        params: &OrganizationParams,
    ) -> Result<Organization>;
}
