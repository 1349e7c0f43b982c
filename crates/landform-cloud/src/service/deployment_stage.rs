use super::absent_is_deleted;
use crate::context::Context;
use crate::error::{ResourceKind, Result};
use crate::model::{DeploymentStage, DeploymentStageParams, DeploymentStageUpsert};
use crate::repository::DeploymentStageRepository;
use std::sync::Arc;
use tracing::{debug, info};

pub struct DeploymentStageService {
    stages: Arc<dyn DeploymentStageRepository>,
}

impl DeploymentStageService {
    pub fn new(stages: Arc<dyn DeploymentStageRepository>) -> Self {
        Self { stages }
    }

    pub async fn create(
        &self,
        ctx: &Context,
        environment_id: &str,
        params: DeploymentStageParams,
    ) -> Result<DeploymentStage> {
        let upsert = DeploymentStageUpsert::new(params)?;
        info!(environment = environment_id, name = %upsert.request.name, "creating deployment stage");

        let stage = self
            .stages
            .create(ctx, environment_id, &upsert.request)
            .await?;
        self.reorder(ctx, stage, &upsert).await
    }

    pub async fn get(&self, ctx: &Context, stage_id: &str) -> Result<DeploymentStage> {
        self.stages.get(ctx, stage_id).await
    }

    pub async fn update(
        &self,
        ctx: &Context,
        stage_id: &str,
        params: DeploymentStageParams,
    ) -> Result<DeploymentStage> {
        let upsert = DeploymentStageUpsert::new(params)?;
        info!(stage = stage_id, "updating deployment stage");

        let stage = self.stages.update(ctx, stage_id, &upsert.request).await?;
        self.reorder(ctx, stage, &upsert).await
    }

    /// Delete the stage; a stage that no longer exists is a success
    pub async fn delete(&self, ctx: &Context, stage_id: &str) -> Result<()> {
        if let Err(e) = self.stages.get(ctx, stage_id).await {
            return absent_is_deleted(Err(e), ResourceKind::DeploymentStage, stage_id);
        }
        info!(stage = stage_id, "deleting deployment stage");
        let deleted = self.stages.delete(ctx, stage_id).await;
        absent_is_deleted(deleted, ResourceKind::DeploymentStage, stage_id)
    }

    /// Apply MoveAfter, then MoveBefore
    async fn reorder(
        &self,
        ctx: &Context,
        mut stage: DeploymentStage,
        upsert: &DeploymentStageUpsert,
    ) -> Result<DeploymentStage> {
        if let Some(after) = &upsert.move_after {
            debug!(stage = %stage.id, after = %after, "moving deployment stage");
            stage = self.stages.move_after(ctx, &stage.id, after).await?;
        }
        if let Some(before) = &upsert.move_before {
            debug!(stage = %stage.id, before = %before, "moving deployment stage");
            stage = self.stages.move_before(ctx, &stage.id, before).await?;
        }
        Ok(stage)
    }
}
