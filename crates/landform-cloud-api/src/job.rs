//! Job and job variable endpoints

use crate::client::{ApiClient, Call, Results};
use async_trait::async_trait;
use landform_cloud::model::{
    CronScheduleParams, DockerParams, ExecutionCommand, GitRepositoryParams, ImageParams, Job,
    JobSchedule, JobScheduleParams, JobSource, JobSourceParams, JobUpsertRequest, Variable,
    VariableKind, VariableUpsert,
};
use landform_cloud::{
    Cause, Context, JobRepository, Operation, ResourceKind, Result, VariableRepository,
};
use reqwest::Method;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SourceWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image: Option<ImageWire>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    docker: Option<DockerWire>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageWire {
    registry_id: String,
    image_name: String,
    tag: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DockerWire {
    git_repository: GitWire,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dockerfile_path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GitWire {
    url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    commit_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    root_path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    on_start: Option<ExecutionCommand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    on_stop: Option<ExecutionCommand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    on_delete: Option<ExecutionCommand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cronjob: Option<CronWire>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CronWire {
    scheduled_at: String,
    command: ExecutionCommand,
}

impl From<JobSource> for SourceWire {
    fn from(source: JobSource) -> Self {
        let params = JobSourceParams::from(source);
        Self {
            image: params.image.map(|image| ImageWire {
                registry_id: image.registry_id,
                image_name: image.name,
                tag: image.tag,
            }),
            docker: params.docker.map(|docker| DockerWire {
                git_repository: GitWire {
                    url: docker.git_repository.url,
                    branch: docker.git_repository.branch,
                    commit_id: docker.git_repository.commit_id,
                    root_path: docker.git_repository.root_path,
                },
                dockerfile_path: docker.dockerfile_path,
            }),
        }
    }
}

impl SourceWire {
    fn into_source(self) -> landform_cloud::Result<JobSource> {
        JobSource::new(JobSourceParams {
            image: self.image.map(|image| ImageParams {
                registry_id: image.registry_id,
                name: image.image_name,
                tag: image.tag,
            }),
            docker: self.docker.map(|docker| DockerParams {
                git_repository: GitRepositoryParams {
                    url: docker.git_repository.url,
                    branch: docker.git_repository.branch,
                    commit_id: docker.git_repository.commit_id,
                    root_path: docker.git_repository.root_path,
                },
                dockerfile_path: docker.dockerfile_path,
            }),
        })
    }
}

impl From<JobSchedule> for ScheduleWire {
    fn from(schedule: JobSchedule) -> Self {
        let params = JobScheduleParams::from(schedule);
        Self {
            on_start: params.on_start,
            on_stop: params.on_stop,
            on_delete: params.on_delete,
            cronjob: params.cronjob.map(|cron| CronWire {
                scheduled_at: cron.schedule,
                command: cron.command,
            }),
        }
    }
}

impl ScheduleWire {
    fn into_schedule(self) -> landform_cloud::Result<JobSchedule> {
        JobSchedule::new(JobScheduleParams {
            on_start: self.on_start,
            on_stop: self.on_stop,
            on_delete: self.on_delete,
            cronjob: self.cronjob.map(|cron| CronScheduleParams {
                schedule: cron.scheduled_at,
                command: cron.command,
            }),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JobBody {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    auto_preview: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cpu: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    memory: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_nb_restart: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_duration_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
    source: SourceWire,
    schedule: ScheduleWire,
}

impl From<&JobUpsertRequest> for JobBody {
    fn from(request: &JobUpsertRequest) -> Self {
        Self {
            name: request.name.clone(),
            auto_preview: request.auto_preview,
            cpu: request.cpu,
            memory: request.memory,
            max_nb_restart: request.max_nb_restart,
            max_duration_seconds: request.max_duration_seconds,
            port: request.port,
            source: request.source.clone().into(),
            schedule: request.schedule.clone().into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Reference {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobResponse {
    id: String,
    environment: Reference,
    name: String,
    cpu: u32,
    memory: u32,
    #[serde(default)]
    max_nb_restart: u32,
    #[serde(default)]
    max_duration_seconds: u32,
    #[serde(default)]
    auto_preview: bool,
    #[serde(default)]
    port: Option<u16>,
    source: SourceWire,
    schedule: ScheduleWire,
    #[serde(default)]
    internal_host: Option<String>,
    #[serde(default)]
    external_host: Option<String>,
}

impl JobResponse {
    /// Variables and the stage are filled in by the job service
    fn into_job(self, call: Call<'_>) -> Result<Job> {
        let invalid = |e: landform_cloud::CloudError| {
            call.error(Cause::Transport(format!("invalid job in response: {}", e)))
        };
        Ok(Job {
            id: self.id,
            environment_id: self.environment.id,
            name: self.name,
            cpu: self.cpu,
            memory: self.memory,
            max_nb_restart: self.max_nb_restart,
            max_duration_seconds: self.max_duration_seconds,
            auto_preview: self.auto_preview,
            port: self.port,
            source: self.source.into_source().map_err(invalid)?,
            schedule: self.schedule.into_schedule().map_err(invalid)?,
            environment_variables: Vec::new(),
            built_in_environment_variables: Vec::new(),
            secrets: Vec::new(),
            internal_host: self.internal_host,
            external_host: self.external_host,
            deployment_stage_id: None,
        })
    }
}

fn variables_path(kind: VariableKind, service_id: &str) -> String {
    let collection = match kind {
        VariableKind::EnvironmentVariable => "environmentVariable",
        VariableKind::Secret => "secret",
    };
    format!("/job/{}/{}", service_id, collection)
}

#[async_trait]
impl JobRepository for ApiClient {
    async fn create(
        &self,
        ctx: &Context,
        environment_id: &str,
        request: &JobUpsertRequest,
    ) -> Result<Job> {
        let call = Call::new(Operation::Create, ResourceKind::Job, &request.name);
        let response: JobResponse = self
            .send(
                ctx,
                call,
                Method::POST,
                &format!("/environment/{}/job", environment_id),
                &JobBody::from(request),
            )
            .await?;
        response.into_job(call)
    }

    async fn get(&self, ctx: &Context, job_id: &str) -> Result<Job> {
        let call = Call::new(Operation::Read, ResourceKind::Job, job_id);
        let response: JobResponse = self.fetch(ctx, call, &format!("/job/{}", job_id)).await?;
        response.into_job(call)
    }

    async fn update(&self, ctx: &Context, job_id: &str, request: &JobUpsertRequest) -> Result<Job> {
        let call = Call::new(Operation::Update, ResourceKind::Job, job_id);
        let response: JobResponse = self
            .send(
                ctx,
                call,
                Method::PUT,
                &format!("/job/{}", job_id),
                &JobBody::from(request),
            )
            .await?;
        response.into_job(call)
    }

    async fn delete(&self, ctx: &Context, job_id: &str) -> Result<()> {
        let call = Call::new(Operation::Delete, ResourceKind::Job, job_id);
        self.send_empty(ctx, call, Method::DELETE, &format!("/job/{}", job_id))
            .await
    }
}

#[async_trait]
impl VariableRepository for ApiClient {
    async fn list(
        &self,
        ctx: &Context,
        kind: VariableKind,
        service_id: &str,
    ) -> Result<Vec<Variable>> {
        let call = Call::new(Operation::Read, kind.resource(), service_id);
        let listing: Results<Variable> = self
            .fetch(ctx, call, &variables_path(kind, service_id))
            .await?;
        Ok(listing.results)
    }

    async fn create(
        &self,
        ctx: &Context,
        kind: VariableKind,
        service_id: &str,
        request: &VariableUpsert,
    ) -> Result<Variable> {
        let call = Call::new(Operation::Create, kind.resource(), &request.key);
        self.send(
            ctx,
            call,
            Method::POST,
            &variables_path(kind, service_id),
            request,
        )
        .await
    }

    async fn update(
        &self,
        ctx: &Context,
        kind: VariableKind,
        service_id: &str,
        variable_id: &str,
        request: &VariableUpsert,
    ) -> Result<Variable> {
        let call = Call::new(Operation::Update, kind.resource(), variable_id);
        self.send(
            ctx,
            call,
            Method::PUT,
            &format!("{}/{}", variables_path(kind, service_id), variable_id),
            request,
        )
        .await
    }

    async fn delete(
        &self,
        ctx: &Context,
        kind: VariableKind,
        service_id: &str,
        variable_id: &str,
    ) -> Result<()> {
        let call = Call::new(Operation::Delete, kind.resource(), variable_id);
        self.send_empty(
            ctx,
            call,
            Method::DELETE,
            &format!("{}/{}", variables_path(kind, service_id), variable_id),
        )
        .await
    }
}
