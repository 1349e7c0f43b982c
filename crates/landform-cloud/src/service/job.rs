use super::absent_is_deleted;
use crate::context::Context;
use crate::error::{ResourceKind, Result};
use crate::model::{
    Job, JobParams, JobUpsertRequest, Variable, VariableDiff, VariableKind, VariableParams,
    VariableScope, value_digest,
};
use crate::repository::{DeploymentStageRepository, JobRepository, VariableRepository};
use std::sync::Arc;
use tracing::{debug, info};

/// Jobs together with their variables, secrets and deployment stage
pub struct JobService {
    jobs: Arc<dyn JobRepository>,
    variables: Arc<dyn VariableRepository>,
    stages: Arc<dyn DeploymentStageRepository>,
}

impl JobService {
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        variables: Arc<dyn VariableRepository>,
        stages: Arc<dyn DeploymentStageRepository>,
    ) -> Self {
        Self {
            jobs,
            variables,
            stages,
        }
    }

    /// Create the job, push its variables, attach it to its stage and read
    /// everything back
    pub async fn create(
        &self,
        ctx: &Context,
        environment_id: &str,
        params: JobParams,
    ) -> Result<Job> {
        let request = JobUpsertRequest::new(params)?;
        info!(environment = environment_id, name = %request.name, "creating job");

        let job = self.jobs.create(ctx, environment_id, &request).await?;
        self.sync_variables(ctx, &job.id, &request, &[], &[]).await?;
        self.attach_stage(ctx, &job.id, &request).await?;
        self.hydrate(ctx, job, &request.secrets).await
    }

    pub async fn get(&self, ctx: &Context, job_id: &str) -> Result<Job> {
        let job = self.jobs.get(ctx, job_id).await?;
        self.hydrate(ctx, job, &[]).await
    }

    /// Update the job body, then converge variables and secrets
    ///
    /// Variables are diffed against `prior` when given, otherwise against what
    /// the remote system reports. Secret values are never read back: a secret
    /// is left alone only when `prior` carries the fingerprint of the same
    /// value (as the output of create or update does). Otherwise every
    /// declared secret is rewritten.
    pub async fn update(
        &self,
        ctx: &Context,
        job_id: &str,
        params: JobParams,
        prior: Option<&Job>,
    ) -> Result<Job> {
        let request = JobUpsertRequest::new(params)?;
        info!(job = job_id, "updating job");

        let job = self.jobs.update(ctx, job_id, &request).await?;

        let (prior_variables, prior_secrets) = match prior {
            Some(prior) => (prior.environment_variables.clone(), prior.secrets.clone()),
            None => (
                self.variables
                    .list(ctx, VariableKind::EnvironmentVariable, job_id)
                    .await?,
                self.variables.list(ctx, VariableKind::Secret, job_id).await?,
            ),
        };
        self.sync_variables(ctx, job_id, &request, &prior_variables, &prior_secrets)
            .await?;
        self.attach_stage(ctx, job_id, &request).await?;
        self.hydrate(ctx, job, &request.secrets).await
    }

    /// Delete the job; a job that no longer exists is a success
    pub async fn delete(&self, ctx: &Context, job_id: &str) -> Result<()> {
        if let Err(e) = self.jobs.get(ctx, job_id).await {
            return absent_is_deleted(Err(e), ResourceKind::Job, job_id);
        }
        info!(job = job_id, "deleting job");
        let deleted = self.jobs.delete(ctx, job_id).await;
        absent_is_deleted(deleted, ResourceKind::Job, job_id)
    }

    async fn attach_stage(
        &self,
        ctx: &Context,
        job_id: &str,
        request: &JobUpsertRequest,
    ) -> Result<()> {
        if let Some(stage_id) = &request.deployment_stage_id {
            debug!(job = job_id, stage = %stage_id, "attaching job to deployment stage");
            self.stages.attach_service(ctx, stage_id, job_id).await?;
        }
        Ok(())
    }

    async fn sync_variables(
        &self,
        ctx: &Context,
        job_id: &str,
        request: &JobUpsertRequest,
        prior_variables: &[Variable],
        prior_secrets: &[Variable],
    ) -> Result<()> {
        self.apply_diff(
            ctx,
            VariableKind::EnvironmentVariable,
            job_id,
            &request.environment_variables,
            prior_variables,
        )
        .await?;
        self.apply_diff(
            ctx,
            VariableKind::Secret,
            job_id,
            &request.secrets,
            prior_secrets,
        )
        .await
    }

    async fn apply_diff(
        &self,
        ctx: &Context,
        kind: VariableKind,
        job_id: &str,
        desired: &[VariableParams],
        prior: &[Variable],
    ) -> Result<()> {
        let diff = VariableDiff::compute(desired, prior);
        if diff.is_empty() {
            return Ok(());
        }
        debug!(
            job = job_id,
            ?kind,
            create = diff.create.len(),
            update = diff.update.len(),
            delete = diff.delete.len(),
            "applying variable diff"
        );

        for variable_id in &diff.delete {
            let deleted = self.variables.delete(ctx, kind, job_id, variable_id).await;
            absent_is_deleted(deleted, kind.resource(), variable_id)?;
        }
        for update in &diff.update {
            self.variables
                .update(ctx, kind, job_id, &update.id, &update.request)
                .await?;
        }
        for create in &diff.create {
            self.variables.create(ctx, kind, job_id, create).await?;
        }
        Ok(())
    }

    /// Fill in variables, secrets and the deployment stage
    ///
    /// Secrets named in `written` get the fingerprint of the value just sent.
    async fn hydrate(&self, ctx: &Context, job: Job, written: &[VariableParams]) -> Result<Job> {
        let variables = self
            .variables
            .list(ctx, VariableKind::EnvironmentVariable, &job.id)
            .await?;
        let secrets = self
            .variables
            .list(ctx, VariableKind::Secret, &job.id)
            .await?;
        let deployment_stage_id = match self.stages.get_service_stage(ctx, &job.id).await {
            Ok(stage) => Some(stage.id),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };

        let (environment_variables, built_in_environment_variables): (Vec<_>, Vec<_>) = variables
            .into_iter()
            .partition(|v| v.scope == VariableScope::Job);

        Ok(Job {
            environment_variables,
            built_in_environment_variables: built_in_environment_variables
                .into_iter()
                .filter(|v| v.scope == VariableScope::BuiltIn)
                .collect(),
            secrets: secrets
                .into_iter()
                .filter(|v| v.scope == VariableScope::Job)
                .map(|secret| {
                    let digest = written
                        .iter()
                        .find(|p| p.key == secret.key)
                        .map(|p| value_digest(&p.value));
                    Variable {
                        value: None,
                        value_digest: digest,
                        ..secret
                    }
                })
                .collect(),
            deployment_stage_id,
            ..job
        })
    }
}
