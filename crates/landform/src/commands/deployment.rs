use crate::DeploymentCommands;
use crate::utils;
use landform_cloud::Context;
use landform_cloud::model::DeploymentParams;
use landform_cloud_api::Provider;

pub async fn handle(
    provider: &Provider,
    ctx: &Context,
    cmd: DeploymentCommands,
) -> anyhow::Result<()> {
    match cmd {
        DeploymentCommands::Create { params } => {
            let params: DeploymentParams = utils::read_json(&params.params)?;
            let deployment = provider.deployments.create(ctx, params).await?;
            utils::report(
                "deployment reached",
                deployment.desired_state.as_str(),
                deployment.environment_id,
            );
            utils::print_json(&deployment)
        }
        DeploymentCommands::Get { params } => {
            let params: DeploymentParams = utils::read_json(&params.params)?;
            let deployment = provider.deployments.get(ctx, params).await?;
            utils::print_json(&deployment)
        }
        DeploymentCommands::Update { params } => {
            let params: DeploymentParams = utils::read_json(&params.params)?;
            let deployment = provider.deployments.update(ctx, params).await?;
            utils::report(
                "deployment reached",
                deployment.desired_state.as_str(),
                deployment.environment_id,
            );
            utils::print_json(&deployment)
        }
        DeploymentCommands::Delete { params } => {
            let params: DeploymentParams = utils::read_json(&params.params)?;
            let environment_id = params.environment_id.clone();
            provider.deployments.delete(ctx, params).await?;
            utils::report("deleted", "environment", environment_id);
            Ok(())
        }
    }
}
