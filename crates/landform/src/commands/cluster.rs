use crate::ClusterCommands;
use crate::utils;
use landform_cloud::Context;
use landform_cloud::model::{Cluster, ClusterParams};
use landform_cloud_api::Provider;

pub async fn handle(provider: &Provider, ctx: &Context, cmd: ClusterCommands) -> anyhow::Result<()> {
    match cmd {
        ClusterCommands::Create { params } => {
            let params: ClusterParams = utils::read_json(&params.params)?;
            let cluster = provider.clusters.create(ctx, params).await?;
            utils::report("created", "cluster", &cluster.id);
            utils::print_json(&cluster)
        }
        ClusterCommands::Get { organization, id } => {
            let cluster = provider.clusters.get(ctx, &organization, &id).await?;
            utils::print_json(&cluster)
        }
        ClusterCommands::Update { id, params, prior } => {
            let params: ClusterParams = utils::read_json(&params.params)?;
            let prior: Option<Cluster> = utils::read_optional_json(prior.prior.as_deref())?;
            let cluster = provider
                .clusters
                .update(ctx, &id, params, prior.as_ref())
                .await?;
            utils::report("updated", "cluster", &cluster.id);
            utils::print_json(&cluster)
        }
        ClusterCommands::Delete { organization, id } => {
            provider.clusters.delete(ctx, &organization, &id).await?;
            utils::report("deleted", "cluster", &id);
            Ok(())
        }
    }
}
