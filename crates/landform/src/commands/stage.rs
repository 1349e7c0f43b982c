use crate::StageCommands;
use crate::utils;
use landform_cloud::Context;
use landform_cloud::model::DeploymentStageParams;
use landform_cloud_api::Provider;

pub async fn handle(provider: &Provider, ctx: &Context, cmd: StageCommands) -> anyhow::Result<()> {
    match cmd {
        StageCommands::Create {
            environment,
            params,
        } => {
            let params: DeploymentStageParams = utils::read_json(&params.params)?;
            let stage = provider
                .deployment_stages
                .create(ctx, &environment, params)
                .await?;
            utils::report("created", "deployment stage", &stage.id);
            utils::print_json(&stage)
        }
        StageCommands::Get { id } => {
            let stage = provider.deployment_stages.get(ctx, &id).await?;
            utils::print_json(&stage)
        }
        StageCommands::Update { id, params } => {
            let params: DeploymentStageParams = utils::read_json(&params.params)?;
            let stage = provider.deployment_stages.update(ctx, &id, params).await?;
            utils::report("updated", "deployment stage", &stage.id);
            utils::print_json(&stage)
        }
        StageCommands::Delete { id } => {
            provider.deployment_stages.delete(ctx, &id).await?;
            utils::report("deleted", "deployment stage", &id);
            Ok(())
        }
    }
}
