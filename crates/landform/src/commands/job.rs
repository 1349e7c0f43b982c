use crate::JobCommands;
use crate::utils;
use landform_cloud::Context;
use landform_cloud::model::{Job, JobParams};
use landform_cloud_api::Provider;

pub async fn handle(provider: &Provider, ctx: &Context, cmd: JobCommands) -> anyhow::Result<()> {
    match cmd {
        JobCommands::Create {
            environment,
            params,
        } => {
            let params: JobParams = utils::read_json(&params.params)?;
            let job = provider.jobs.create(ctx, &environment, params).await?;
            utils::report("created", "job", &job.id);
            utils::print_json(&job)
        }
        JobCommands::Get { id } => {
            let job = provider.jobs.get(ctx, &id).await?;
            utils::print_json(&job)
        }
        JobCommands::Update { id, params, prior } => {
            let params: JobParams = utils::read_json(&params.params)?;
            let prior: Option<Job> = utils::read_optional_json(prior.prior.as_deref())?;
            let job = provider
                .jobs
                .update(ctx, &id, params, prior.as_ref())
                .await?;
            utils::report("updated", "job", &job.id);
            utils::print_json(&job)
        }
        JobCommands::Delete { id } => {
            provider.jobs.delete(ctx, &id).await?;
            utils::report("deleted", "job", &id);
            Ok(())
        }
    }
}
