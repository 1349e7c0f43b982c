//! Cluster endpoints
//!
//! The platform has no single-cluster read; a cluster is looked up in the
//! organization's cluster listing. Feature values travel as `{id, value}`
//! pairs with upper-case ids.

use crate::client::{ApiClient, Call, Results};
use async_trait::async_trait;
use landform_cloud::model::{
    AdvancedSettings, CloudProvider, CloudProviderInfo, Cluster, ClusterRequest, ClusterRoute,
    KubernetesMode, RoutingTable,
};
use landform_cloud::{
    ApiError, Cause, ClusterRepository, Context, Operation, ResourceKind, Result, State,
};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClusterBody<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    cloud_provider: CloudProvider,
    region: &'a str,
    kubernetes: KubernetesMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    instance_type: Option<&'a str>,
    min_running_nodes: u32,
    max_running_nodes: u32,
    features: Vec<FeatureBody<'a>>,
}

#[derive(Debug, Serialize)]
struct FeatureBody<'a> {
    id: String,
    value: &'a str,
}

impl<'a> From<&'a ClusterRequest> for ClusterBody<'a> {
    fn from(request: &'a ClusterRequest) -> Self {
        Self {
            name: &request.name,
            description: request.description.as_deref(),
            cloud_provider: request.cloud_provider,
            region: &request.region,
            kubernetes: request.kubernetes_mode,
            instance_type: request.instance_type.as_deref(),
            min_running_nodes: request.min_running_nodes,
            max_running_nodes: request.max_running_nodes,
            features: request
                .features
                .iter()
                .map(|(key, value)| FeatureBody {
                    id: key.to_ascii_uppercase(),
                    value,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClusterResponse {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    cloud_provider: CloudProvider,
    region: String,
    #[serde(default)]
    kubernetes: KubernetesMode,
    #[serde(default)]
    instance_type: Option<String>,
    min_running_nodes: u32,
    max_running_nodes: u32,
    #[serde(default)]
    features: Vec<FeatureResponse>,
    #[serde(default)]
    status: Option<StatusResponse>,
}

#[derive(Debug, Deserialize)]
struct FeatureResponse {
    id: String,
    #[serde(default)]
    value: Value,
}

impl ClusterResponse {
    fn into_cluster(self, organization_id: &str) -> Cluster {
        let features = self
            .features
            .into_iter()
            .filter_map(|f| {
                let value = match f.value {
                    Value::Null => return None,
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                Some((f.id.to_ascii_lowercase(), value))
            })
            .collect::<BTreeMap<_, _>>();

        Cluster {
            id: self.id,
            organization_id: organization_id.to_string(),
            name: self.name,
            description: self.description,
            cloud_provider: self.cloud_provider,
            region: self.region,
            credentials_id: String::new(),
            kubernetes_mode: self.kubernetes,
            instance_type: self.instance_type,
            min_running_nodes: self.min_running_nodes,
            max_running_nodes: self.max_running_nodes,
            features,
            routing_table: RoutingTable::default(),
            advanced_settings: AdvancedSettings::new(),
            state: self.status.map_or(State::Unknown, |s| s.status),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: State,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CloudProviderInfoBody {
    cloud_provider: CloudProvider,
    credentials: CredentialsRef,
    region: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct CredentialsRef {
    id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct RoutesBody {
    routes: Vec<ClusterRoute>,
}

fn cluster_path(organization_id: &str, cluster_id: &str) -> String {
    format!("/organization/{}/cluster/{}", organization_id, cluster_id)
}

fn routing_table(call: Call<'_>, body: RoutesBody) -> Result<RoutingTable> {
    RoutingTable::new(body.routes)
        .map_err(|e| call.error(Cause::Transport(format!("invalid routing table: {}", e))))
}

#[async_trait]
impl ClusterRepository for ApiClient {
    async fn create(
        &self,
        ctx: &Context,
        organization_id: &str,
        request: &ClusterRequest,
    ) -> Result<Cluster> {
        let call = Call::new(Operation::Create, ResourceKind::Cluster, &request.name);
        let response: ClusterResponse = self
            .send(
                ctx,
                call,
                Method::POST,
                &format!("/organization/{}/cluster", organization_id),
                &ClusterBody::from(request),
            )
            .await?;
        Ok(response.into_cluster(organization_id))
    }

    async fn get(
        &self,
        ctx: &Context,
        organization_id: &str,
        cluster_id: &str,
    ) -> Result<Cluster> {
        let call = Call::new(Operation::Read, ResourceKind::Cluster, cluster_id);
        let listing: Results<ClusterResponse> = self
            .fetch(
                ctx,
                call,
                &format!("/organization/{}/cluster", organization_id),
            )
            .await?;
        listing
            .results
            .into_iter()
            .find(|c| c.id == cluster_id)
            .map(|c| c.into_cluster(organization_id))
            .ok_or_else(|| {
                ApiError::not_found(Operation::Read, ResourceKind::Cluster, cluster_id).into()
            })
    }

    async fn update(
        &self,
        ctx: &Context,
        organization_id: &str,
        cluster_id: &str,
        request: &ClusterRequest,
    ) -> Result<Cluster> {
        let call = Call::new(Operation::Update, ResourceKind::Cluster, cluster_id);
        let path = format!(
            "{}?forceUpdate={}",
            cluster_path(organization_id, cluster_id),
            request.force_update
        );
        let response: ClusterResponse = self
            .send(ctx, call, Method::PUT, &path, &ClusterBody::from(request))
            .await?;
        Ok(response.into_cluster(organization_id))
    }

    async fn delete(&self, ctx: &Context, organization_id: &str, cluster_id: &str) -> Result<()> {
        let call = Call::new(Operation::Delete, ResourceKind::Cluster, cluster_id);
        self.send_empty(
            ctx,
            call,
            Method::DELETE,
            &cluster_path(organization_id, cluster_id),
        )
        .await
    }

    async fn get_status(
        &self,
        ctx: &Context,
        organization_id: &str,
        cluster_id: &str,
    ) -> Result<State> {
        let call = Call::new(Operation::StatusCheck, ResourceKind::Cluster, cluster_id);
        let status: StatusResponse = self
            .fetch(
                ctx,
                call,
                &format!("{}/status", cluster_path(organization_id, cluster_id)),
            )
            .await?;
        Ok(status.status)
    }

    async fn deploy(&self, ctx: &Context, organization_id: &str, cluster_id: &str) -> Result<()> {
        let call = Call::new(Operation::Deploy, ResourceKind::Cluster, cluster_id);
        self.send_empty(
            ctx,
            call,
            Method::POST,
            &format!("{}/deploy", cluster_path(organization_id, cluster_id)),
        )
        .await
    }

    async fn stop(&self, ctx: &Context, organization_id: &str, cluster_id: &str) -> Result<()> {
        let call = Call::new(Operation::Stop, ResourceKind::Cluster, cluster_id);
        self.send_empty(
            ctx,
            call,
            Method::POST,
            &format!("{}/stop", cluster_path(organization_id, cluster_id)),
        )
        .await
    }

    async fn apply_update(
        &self,
        ctx: &Context,
        organization_id: &str,
        cluster_id: &str,
    ) -> Result<()> {
        let call = Call::new(Operation::Deploy, ResourceKind::Cluster, cluster_id);
        self.send_empty(
            ctx,
            call,
            Method::POST,
            &format!("{}/update", cluster_path(organization_id, cluster_id)),
        )
        .await
    }

    async fn get_cloud_provider_info(
        &self,
        ctx: &Context,
        organization_id: &str,
        cluster_id: &str,
    ) -> Result<CloudProviderInfo> {
        let call = Call::new(
            Operation::Read,
            ResourceKind::ClusterCloudProvider,
            cluster_id,
        );
        let body: CloudProviderInfoBody = self
            .fetch(
                ctx,
                call,
                &format!(
                    "{}/cloudProviderInfo",
                    cluster_path(organization_id, cluster_id)
                ),
            )
            .await?;
        Ok(CloudProviderInfo {
            cloud_provider: body.cloud_provider,
            credentials_id: body.credentials.id,
            region: body.region,
        })
    }

    async fn specify_cloud_provider_info(
        &self,
        ctx: &Context,
        organization_id: &str,
        cluster_id: &str,
        info: &CloudProviderInfo,
    ) -> Result<()> {
        let call = Call::new(
            Operation::Update,
            ResourceKind::ClusterCloudProvider,
            cluster_id,
        );
        let body = CloudProviderInfoBody {
            cloud_provider: info.cloud_provider,
            credentials: CredentialsRef {
                id: info.credentials_id.clone(),
            },
            region: info.region.clone(),
        };
        self.send_discard(
            ctx,
            call,
            Method::POST,
            &format!(
                "{}/cloudProviderInfo",
                cluster_path(organization_id, cluster_id)
            ),
            &body,
        )
        .await
    }

    async fn get_routing_table(
        &self,
        ctx: &Context,
        organization_id: &str,
        cluster_id: &str,
    ) -> Result<RoutingTable> {
        let call = Call::new(
            Operation::Read,
            ResourceKind::ClusterRoutingTable,
            cluster_id,
        );
        let body: RoutesBody = self
            .fetch(
                ctx,
                call,
                &format!("{}/routingTable", cluster_path(organization_id, cluster_id)),
            )
            .await?;
        routing_table(call, body)
    }

    async fn edit_routing_table(
        &self,
        ctx: &Context,
        organization_id: &str,
        cluster_id: &str,
        table: &RoutingTable,
    ) -> Result<RoutingTable> {
        let call = Call::new(
            Operation::Update,
            ResourceKind::ClusterRoutingTable,
            cluster_id,
        );
        let request = RoutesBody {
            routes: table.routes().to_vec(),
        };
        let body: RoutesBody = self
            .send(
                ctx,
                call,
                Method::PUT,
                &format!("{}/routingTable", cluster_path(organization_id, cluster_id)),
                &request,
            )
            .await?;
        routing_table(call, body)
    }

    async fn get_advanced_settings(
        &self,
        ctx: &Context,
        organization_id: &str,
        cluster_id: &str,
    ) -> Result<AdvancedSettings> {
        let call = Call::new(
            Operation::Read,
            ResourceKind::ClusterAdvancedSettings,
            cluster_id,
        );
        self.fetch(
            ctx,
            call,
            &format!(
                "{}/advancedSettings",
                cluster_path(organization_id, cluster_id)
            ),
        )
        .await
    }

    async fn edit_advanced_settings(
        &self,
        ctx: &Context,
        organization_id: &str,
        cluster_id: &str,
        settings: &AdvancedSettings,
    ) -> Result<AdvancedSettings> {
        let call = Call::new(
            Operation::Update,
            ResourceKind::ClusterAdvancedSettings,
            cluster_id,
        );
        self.send(
            ctx,
            call,
            Method::PUT,
            &format!(
                "{}/advancedSettings",
                cluster_path(organization_id, cluster_id)
            ),
            settings,
        )
        .await
    }
}
