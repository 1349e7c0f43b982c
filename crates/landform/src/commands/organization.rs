use crate::OrganizationCommands;
use crate::utils;
use landform_cloud::Context;
use landform_cloud::model::OrganizationParams;
use landform_cloud_api::Provider;

pub async fn handle(
    provider: &Provider,
    ctx: &Context,
    cmd: OrganizationCommands,
) -> anyhow::Result<()> {
    match cmd {
        OrganizationCommands::Create { params } => {
            let params: OrganizationParams = utils::read_json(&params.params)?;
            provider.organizations.create(ctx, params).await?;
            Ok(())
        }
        OrganizationCommands::Get { id } => {
            let organization = provider.organizations.get(ctx, &id).await?;
            utils::print_json(&organization)
        }
        OrganizationCommands::Update { id, params } => {
            let params: OrganizationParams = utils::read_json(&params.params)?;
            let organization = provider.organizations.update(ctx, &id, params).await?;
            utils::report("updated", "organization", &organization.id);
            utils::print_json(&organization)
        }
        OrganizationCommands::Delete { id } => {
            provider.organizations.delete(ctx, &id).await?;
            Ok(())
        }
    }
}
