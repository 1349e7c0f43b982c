use super::{absent_is_deleted, wait_for_deletion, wait_for_state, wait_for_terminal};
use crate::context::Context;
use crate::error::{ResourceKind, Result};
use crate::model::{Cluster, ClusterParams};
use crate::plan::{ClusterUpsertPlan, StatusAction};
use crate::repository::ClusterRepository;
use crate::state::{DesiredState, State};
use crate::wait::PollPolicy;
use std::sync::Arc;
use tracing::{debug, info};

/// Creates, reads, updates and deletes clusters together with their
/// cloud-provider info, routing table and advanced settings
pub struct ClusterService {
    clusters: Arc<dyn ClusterRepository>,
    policy: PollPolicy,
}

impl ClusterService {
    pub fn new(clusters: Arc<dyn ClusterRepository>, policy: PollPolicy) -> Self {
        Self { clusters, policy }
    }

    pub async fn create(&self, ctx: &Context, params: ClusterParams) -> Result<Cluster> {
        let plan = ClusterUpsertPlan::new(&params, None)?;
        info!(organization = %params.organization_id, name = %params.name, "creating cluster");

        let body = self
            .clusters
            .create(ctx, &params.organization_id, &plan.request)
            .await?;
        self.apply(ctx, &params, &plan, body).await
    }

    pub async fn get(&self, ctx: &Context, organization_id: &str, cluster_id: &str) -> Result<Cluster> {
        let body = self.clusters.get(ctx, organization_id, cluster_id).await?;
        let info = self
            .clusters
            .get_cloud_provider_info(ctx, organization_id, cluster_id)
            .await?;
        let routing_table = self
            .clusters
            .get_routing_table(ctx, organization_id, cluster_id)
            .await?;
        let advanced_settings = self
            .clusters
            .get_advanced_settings(ctx, organization_id, cluster_id)
            .await?;

        Ok(Cluster {
            credentials_id: info.credentials_id,
            region: info.region,
            routing_table,
            advanced_settings,
            ..body
        })
    }

    /// Apply `params` to an existing cluster
    ///
    /// `prior` is the last known state of the cluster. Feature or routing
    /// table changes relative to it force the update; without it the update
    /// is planned as if the cluster were new.
    pub async fn update(
        &self,
        ctx: &Context,
        cluster_id: &str,
        params: ClusterParams,
        prior: Option<&Cluster>,
    ) -> Result<Cluster> {
        let plan = ClusterUpsertPlan::new(&params, prior)?;
        info!(cluster = cluster_id, %plan, "updating cluster");

        let body = self
            .clusters
            .update(ctx, &params.organization_id, cluster_id, &plan.request)
            .await?;
        self.apply(ctx, &params, &plan, body).await
    }

    /// Wait for any transition to settle, delete, then wait for DELETED
    pub async fn delete(&self, ctx: &Context, organization_id: &str, cluster_id: &str) -> Result<()> {
        let clusters = &self.clusters;
        let get_status = || clusters.get_status(ctx, organization_id, cluster_id);

        if let Err(e) = wait_for_terminal(
            ctx,
            &self.policy,
            ResourceKind::Cluster,
            cluster_id,
            get_status,
        )
        .await
        {
            return absent_is_deleted(Err(e), ResourceKind::Cluster, cluster_id);
        }

        info!(cluster = cluster_id, "deleting cluster");
        let deleted = self.clusters.delete(ctx, organization_id, cluster_id).await;
        absent_is_deleted(deleted, ResourceKind::Cluster, cluster_id)?;

        wait_for_deletion(
            ctx,
            &self.policy,
            ResourceKind::Cluster,
            cluster_id,
            get_status,
        )
        .await
    }

    /// Sub-resources first, then the lifecycle call the plan asks for
    async fn apply(
        &self,
        ctx: &Context,
        params: &ClusterParams,
        plan: &ClusterUpsertPlan,
        body: Cluster,
    ) -> Result<Cluster> {
        let organization_id = params.organization_id.as_str();
        let cluster_id = body.id.clone();

        if plan.specify_cloud_provider {
            debug!(cluster = %cluster_id, credentials = %params.credentials_id, "specifying cloud provider info");
            self.clusters
                .specify_cloud_provider_info(
                    ctx,
                    organization_id,
                    &cluster_id,
                    &params.cloud_provider_info(),
                )
                .await?;
        }
        let info = self
            .clusters
            .get_cloud_provider_info(ctx, organization_id, &cluster_id)
            .await?;

        let routing_table = if plan.edit_routing_table {
            debug!(cluster = %cluster_id, routes = params.routing_table.len(), "editing routing table");
            self.clusters
                .edit_routing_table(ctx, organization_id, &cluster_id, &params.routing_table)
                .await?
        } else {
            self.clusters
                .get_routing_table(ctx, organization_id, &cluster_id)
                .await?
        };

        let advanced_settings = if plan.edit_advanced_settings {
            self.clusters
                .edit_advanced_settings(ctx, organization_id, &cluster_id, &params.advanced_settings)
                .await?
        } else {
            self.clusters
                .get_advanced_settings(ctx, organization_id, &cluster_id)
                .await?
        };

        let state = self.drive_status(ctx, organization_id, &cluster_id, plan).await?;

        Ok(Cluster {
            credentials_id: info.credentials_id,
            region: info.region,
            routing_table,
            advanced_settings,
            state,
            ..body
        })
    }

    async fn drive_status(
        &self,
        ctx: &Context,
        organization_id: &str,
        cluster_id: &str,
        plan: &ClusterUpsertPlan,
    ) -> Result<State> {
        let current = self
            .clusters
            .get_status(ctx, organization_id, cluster_id)
            .await?;
        let action = plan.status_action(current);
        info!(cluster = cluster_id, %current, %action, "driving cluster status");

        let target = match action {
            StatusAction::None => return Ok(current),
            StatusAction::Deploy => {
                self.clusters.deploy(ctx, organization_id, cluster_id).await?;
                DesiredState::Deployed
            }
            StatusAction::Update => {
                self.clusters
                    .apply_update(ctx, organization_id, cluster_id)
                    .await?;
                DesiredState::Deployed
            }
            StatusAction::Stop => {
                self.clusters.stop(ctx, organization_id, cluster_id).await?;
                DesiredState::Stopped
            }
        };

        let clusters = &self.clusters;
        wait_for_state(
            ctx,
            &self.policy,
            ResourceKind::Cluster,
            cluster_id,
            target.target_states(),
            || clusters.get_status(ctx, organization_id, cluster_id),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Cause, Operation};
    use crate::model::{ClusterRoute, RoutingTable};
    use crate::testing::FakeCloud;
    use std::time::Duration;

    const ORG: &str = "org-1";

    fn service(fake: &FakeCloud) -> ClusterService {
        ClusterService::new(
            Arc::new(fake.clone()),
            PollPolicy::fixed(Duration::from_secs(5)),
        )
    }

    fn params() -> ClusterParams {
        serde_json::from_value(serde_json::json!({
            "organization_id": ORG,
            "credentials_id": "cred-1",
            "name": "prod",
            "cloud_provider": "AWS",
            "region": "eu-west-3",
            "instance_type": "t3a.large",
        }))
        .unwrap()
    }

    async fn created(fake: &FakeCloud) -> Cluster {
        let cluster = service(fake)
            .create(&Context::background(), params())
            .await
            .unwrap();
        fake.log().clear();
        cluster
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_sequences_sub_resources_then_deploys() {
        let fake = FakeCloud::new();
        let cluster = service(&fake)
            .create(&Context::background(), params())
            .await
            .unwrap();

        assert_eq!(cluster.state, State::Deployed);
        assert_eq!(cluster.credentials_id, "cred-1");
        let id = cluster.id.as_str();
        assert_eq!(
            fake.calls(),
            vec![
                format!("cluster.create {ORG}"),
                format!("cluster.specify_cloud_provider_info {id} cred-1"),
                format!("cluster.get_cloud_provider_info {id}"),
                format!("cluster.get_routing_table {id}"),
                format!("cluster.get_advanced_settings {id}"),
                format!("cluster.get_status {id}"),
                format!("cluster.deploy {id}"),
                format!("cluster.get_status {id}"),
                format!("cluster.get_status {id}"),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_edits_non_empty_sub_resources() {
        let fake = FakeCloud::new();
        let mut params = params();
        params.routing_table = RoutingTable::new(vec![ClusterRoute {
            destination: "10.0.0.0/16".to_string(),
            target: "igw-1".to_string(),
            description: "internet".to_string(),
        }])
        .unwrap();
        params
            .advanced_settings
            .insert("aws.vpc.enable_s3_flow_logs".to_string(), true.into());

        let cluster = service(&fake)
            .create(&Context::background(), params)
            .await
            .unwrap();

        assert_eq!(fake.log().count("cluster.edit_routing_table"), 1);
        assert_eq!(fake.log().count("cluster.edit_advanced_settings"), 1);
        assert_eq!(cluster.routing_table.len(), 1);
        assert_eq!(
            cluster.advanced_settings["aws.vpc.enable_s3_flow_logs"],
            serde_json::Value::Bool(true)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_stopped_cluster_is_stopped() {
        let fake = FakeCloud::new();
        let mut params = params();
        params.desired_state = DesiredState::Stopped;

        let cluster = service(&fake)
            .create(&Context::background(), params)
            .await
            .unwrap();

        assert_eq!(cluster.state, State::Stopped);
        assert_eq!(fake.log().count("cluster.stop"), 1);
        assert_eq!(fake.log().count("cluster.deploy"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_without_changes_issues_no_lifecycle_call() {
        let fake = FakeCloud::new();
        let prior = created(&fake).await;

        let cluster = service(&fake)
            .update(&Context::background(), &prior.id, params(), Some(&prior))
            .await
            .unwrap();

        assert_eq!(cluster.state, State::Deployed);
        assert_eq!(
            fake.log().mutations(),
            vec![format!("cluster.update {} noforce", prior.id)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_feature_change_forces_infrastructure_update() {
        let fake = FakeCloud::new();
        let prior = created(&fake).await;
        let mut params = params();
        params
            .features
            .insert("vpc_subnet".to_string(), "10.0.0.0/16".to_string());

        service(&fake)
            .update(&Context::background(), &prior.id, params, Some(&prior))
            .await
            .unwrap();

        assert_eq!(
            fake.log().mutations(),
            vec![
                format!("cluster.update {} force", prior.id),
                format!("cluster.apply_update {}", prior.id),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleared_routing_table_is_pushed() {
        let fake = FakeCloud::new();
        let mut prior = created(&fake).await;
        prior.routing_table = RoutingTable::new(vec![ClusterRoute {
            destination: "10.0.0.0/16".to_string(),
            target: "igw-1".to_string(),
            description: String::new(),
        }])
        .unwrap();

        let cluster = service(&fake)
            .update(&Context::background(), &prior.id, params(), Some(&prior))
            .await
            .unwrap();

        assert_eq!(fake.log().count("cluster.edit_routing_table"), 1);
        assert!(cluster.routing_table.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_credentials_change_is_specified() {
        let fake = FakeCloud::new();
        let prior = created(&fake).await;
        let mut params = params();
        params.credentials_id = "cred-2".to_string();

        let cluster = service(&fake)
            .update(&Context::background(), &prior.id, params, Some(&prior))
            .await
            .unwrap();

        assert_eq!(fake.log().count("cluster.specify_cloud_provider_info"), 1);
        assert_eq!(cluster.credentials_id, "cred-2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_hydrates_sub_resources() {
        let fake = FakeCloud::new();
        let created = created(&fake).await;

        let cluster = service(&fake)
            .get(&Context::background(), ORG, &created.id)
            .await
            .unwrap();

        assert_eq!(cluster.credentials_id, "cred-1");
        assert_eq!(cluster.region, "eu-west-3");
        assert!(fake.log().mutations().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_missing_cluster_is_not_found() {
        let fake = FakeCloud::new();
        let err = service(&fake)
            .get(&Context::background(), ORG, "cluster-404")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_waits_for_terminal_then_deleted() {
        let fake = FakeCloud::new();
        let cluster = created(&fake).await;
        fake.script_status(&cluster.id, [State::Deploying, State::Deployed]);

        service(&fake)
            .delete(&Context::background(), ORG, &cluster.id)
            .await
            .unwrap();

        let calls = fake.calls();
        let delete = calls
            .iter()
            .position(|c| c.starts_with("cluster.delete"))
            .unwrap();
        assert_eq!(delete, 2, "{calls:?}");
        assert!(!fake.has_cluster(&cluster.id));
        assert_eq!(fake.log().count("cluster.get_status"), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_of_absent_cluster_succeeds() {
        let fake = FakeCloud::new();
        service(&fake)
            .delete(&Context::background(), ORG, "cluster-404")
            .await
            .unwrap();
        assert_eq!(fake.log().count("cluster.delete"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deploy_failure_is_deploy_error() {
        let fake = FakeCloud::new();
        fake.fail(
            "cluster.deploy",
            Cause::Status {
                code: 400,
                message: "quota exceeded".to_string(),
            },
        );

        let err = service(&fake)
            .create(&Context::background(), params())
            .await
            .unwrap_err();

        let api = err.api().unwrap();
        assert_eq!(api.operation, Operation::Deploy);
        assert_eq!(api.status_code(), Some(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_deploy_times_out() {
        let fake = FakeCloud::new();
        fake.transition("cluster.deploy", [State::Deploying]);
        let ctx = Context::background().with_timeout(Duration::from_secs(60));

        let err = service(&fake).create(&ctx, params()).await.unwrap_err();

        let api = err.api().unwrap();
        assert_eq!(api.operation, Operation::StatusCheck);
        assert_eq!(api.cause, Cause::Timeout);
        assert_eq!(api.resource, ResourceKind::Cluster);
    }
}
