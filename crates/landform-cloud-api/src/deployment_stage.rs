//! Deployment stage endpoints

use crate::client::{ApiClient, Call};
use async_trait::async_trait;
use landform_cloud::model::{DeploymentStage, DeploymentStageRequest};
use landform_cloud::{Context, DeploymentStageRepository, Operation, ResourceKind, Result};
use reqwest::Method;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Reference {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StageResponse {
    id: String,
    environment: Reference,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    deployment_order: Option<u32>,
}

impl From<StageResponse> for DeploymentStage {
    fn from(stage: StageResponse) -> Self {
        Self {
            id: stage.id,
            environment_id: stage.environment.id,
            name: stage.name,
            description: stage.description.unwrap_or_default(),
            deployment_order: stage.deployment_order,
        }
    }
}

impl ApiClient {
    async fn move_stage(
        &self,
        ctx: &Context,
        stage_id: &str,
        direction: &str,
        other_stage_id: &str,
    ) -> Result<DeploymentStage> {
        let call = Call::new(Operation::Update, ResourceKind::DeploymentStage, stage_id);
        let stage: StageResponse = self
            .send(
                ctx,
                call,
                Method::PUT,
                &format!(
                    "/deploymentStage/{}/{}/{}",
                    stage_id, direction, other_stage_id
                ),
                &serde_json::json!({}),
            )
            .await?;
        Ok(stage.into())
    }
}

#[async_trait]
impl DeploymentStageRepository for ApiClient {
    async fn create(
        &self,
        ctx: &Context,
        environment_id: &str,
        request: &DeploymentStageRequest,
    ) -> Result<DeploymentStage> {
        let call = Call::new(
            Operation::Create,
            ResourceKind::DeploymentStage,
            &request.name,
        );
        let stage: StageResponse = self
            .send(
                ctx,
                call,
                Method::POST,
                &format!("/environment/{}/deploymentStage", environment_id),
                request,
            )
            .await?;
        Ok(stage.into())
    }

    async fn get(&self, ctx: &Context, stage_id: &str) -> Result<DeploymentStage> {
        let call = Call::new(Operation::Read, ResourceKind::DeploymentStage, stage_id);
        let stage: StageResponse = self
            .fetch(ctx, call, &format!("/deploymentStage/{}", stage_id))
            .await?;
        Ok(stage.into())
    }

    async fn update(
        &self,
        ctx: &Context,
        stage_id: &str,
        request: &DeploymentStageRequest,
    ) -> Result<DeploymentStage> {
        let call = Call::new(Operation::Update, ResourceKind::DeploymentStage, stage_id);
        let stage: StageResponse = self
            .send(
                ctx,
                call,
                Method::PUT,
                &format!("/deploymentStage/{}", stage_id),
                request,
            )
            .await?;
        Ok(stage.into())
    }

    async fn delete(&self, ctx: &Context, stage_id: &str) -> Result<()> {
        let call = Call::new(Operation::Delete, ResourceKind::DeploymentStage, stage_id);
        self.send_empty(
            ctx,
            call,
            Method::DELETE,
            &format!("/deploymentStage/{}", stage_id),
        )
        .await
    }

    async fn move_after(
        &self,
        ctx: &Context,
        stage_id: &str,
        after_stage_id: &str,
    ) -> Result<DeploymentStage> {
        self.move_stage(ctx, stage_id, "moveAfter", after_stage_id)
            .await
    }

    async fn move_before(
        &self,
        ctx: &Context,
        stage_id: &str,
        before_stage_id: &str,
    ) -> Result<DeploymentStage> {
        self.move_stage(ctx, stage_id, "moveBefore", before_stage_id)
            .await
    }

    async fn attach_service(
        &self,
        ctx: &Context,
        stage_id: &str,
        service_id: &str,
    ) -> Result<()> {
        let call = Call::new(Operation::Update, ResourceKind::DeploymentStage, stage_id);
        self.send_empty(
            ctx,
            call,
            Method::PUT,
            &format!("/deploymentStage/{}/service/{}", stage_id, service_id),
        )
        .await
    }

    async fn get_service_stage(
        &self,
        ctx: &Context,
        service_id: &str,
    ) -> Result<DeploymentStage> {
        let call = Call::new(Operation::Read, ResourceKind::DeploymentStage, service_id);
        let stage: StageResponse = self
            .fetch(ctx, call, &format!("/service/{}/deploymentStage", service_id))
            .await?;
        Ok(stage.into())
    }
}
