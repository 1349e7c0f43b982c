//! Domain entities
//!
//! Every entity is a plain value built from caller parameters through a
//! validating constructor. The remote platform owns the actual resources.

pub mod cluster;
pub mod deployment;
pub mod deployment_stage;
pub mod git_repository;
pub mod job;
pub mod organization;
pub mod routing_table;
pub mod variable;

pub use cluster::{
    AdvancedSettings, CloudProvider, CloudProviderInfo, Cluster, ClusterParams, ClusterRequest,
    FEATURE_VPC_SUBNET, KubernetesMode,
};
pub use deployment::{Deployment, DeploymentParams};
pub use deployment_stage::{
    DeploymentStage, DeploymentStageParams, DeploymentStageRequest, DeploymentStageUpsert,
};
pub use git_repository::{GitRepository, GitRepositoryParams};
pub use job::{
    CronSchedule, CronScheduleParams, DockerParams, DockerSource, ExecutionCommand, Image,
    ImageParams, Job, JobParams, JobSchedule, JobScheduleParams, JobSource, JobSourceParams,
    JobUpsertRequest, LifecycleTriggers,
};
pub use organization::{Organization, OrganizationParams, Plan};
pub use routing_table::{ClusterRoute, RoutingTable};
pub use variable::{
    Variable, VariableDiff, VariableKind, VariableParams, VariableScope, VariableUpdate,
    VariableUpsert, value_digest,
};
