//! Job definition
//!
//! A job runs a container built from a [`JobSource`] either in reaction to
//! environment lifecycle events or on a cron schedule ([`JobSchedule`]).
//! Callers describe both as optional fields ([`JobSourceParams`],
//! [`JobScheduleParams`]); construction turns them into tagged unions and
//! rejects the "both set" and "neither set" shapes.

use super::git_repository::{GitRepository, GitRepositoryParams};
use super::variable::{self, Variable, VariableKind, VariableParams};
use crate::error::{CloudError, ResourceKind, Result};
use serde::{Deserialize, Serialize};

/// Command executed by a job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionCommand {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,
    #[serde(default)]
    pub arguments: Vec<String>,
}

impl ExecutionCommand {
    pub fn validate(&self) -> Result<()> {
        if let Some(entrypoint) = &self.entrypoint
            && entrypoint.trim().is_empty()
        {
            return Err(invalid("entrypoint must not be empty when set"));
        }
        Ok(())
    }
}

/// Container image from a registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub registry_id: String,
    pub name: String,
    pub tag: String,
}

/// Docker build from a git repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerSource {
    pub git_repository: GitRepository,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile_path: Option<String>,
}

/// Where the job's container comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobSource {
    Image(Image),
    Docker(DockerSource),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageParams {
    #[serde(default)]
    pub registry_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tag: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerParams {
    #[serde(default)]
    pub git_repository: GitRepositoryParams,
    #[serde(default)]
    pub dockerfile_path: Option<String>,
}

/// Exactly one of `image` or `docker` must be set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSourceParams {
    #[serde(default)]
    pub image: Option<ImageParams>,
    #[serde(default)]
    pub docker: Option<DockerParams>,
}

impl JobSource {
    pub fn new(params: JobSourceParams) -> Result<Self> {
        match (params.image, params.docker) {
            (Some(image), None) => {
                for (field, value) in [
                    ("registry_id", &image.registry_id),
                    ("name", &image.name),
                    ("tag", &image.tag),
                ] {
                    if value.trim().is_empty() {
                        return Err(invalid(format!("image {} is required", field)));
                    }
                }
                Ok(JobSource::Image(Image {
                    registry_id: image.registry_id,
                    name: image.name,
                    tag: image.tag,
                }))
            }
            (None, Some(docker)) => Ok(JobSource::Docker(DockerSource {
                git_repository: GitRepository::new(docker.git_repository)?,
                dockerfile_path: docker.dockerfile_path,
            })),
            (Some(_), Some(_)) => Err(invalid("source must set only one of image or docker")),
            (None, None) => Err(invalid("source must set one of image or docker")),
        }
    }
}

impl From<JobSource> for JobSourceParams {
    fn from(source: JobSource) -> Self {
        match source {
            JobSource::Image(image) => JobSourceParams {
                image: Some(ImageParams {
                    registry_id: image.registry_id,
                    name: image.name,
                    tag: image.tag,
                }),
                docker: None,
            },
            JobSource::Docker(docker) => JobSourceParams {
                image: None,
                docker: Some(DockerParams {
                    git_repository: docker.git_repository.into(),
                    dockerfile_path: docker.dockerfile_path,
                }),
            },
        }
    }
}

/// Commands run when the environment starts, stops or is deleted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleTriggers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_start: Option<ExecutionCommand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_stop: Option<ExecutionCommand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<ExecutionCommand>,
}

/// A command run on a cron schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronSchedule {
    pub schedule: String,
    pub command: ExecutionCommand,
}

/// When the job runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobSchedule {
    Lifecycle(LifecycleTriggers),
    Cron(CronSchedule),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronScheduleParams {
    #[serde(default)]
    pub schedule: String,
    #[serde(default)]
    pub command: ExecutionCommand,
}

/// Either lifecycle triggers or a cron job, never both
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobScheduleParams {
    #[serde(default)]
    pub on_start: Option<ExecutionCommand>,
    #[serde(default)]
    pub on_stop: Option<ExecutionCommand>,
    #[serde(default)]
    pub on_delete: Option<ExecutionCommand>,
    #[serde(default)]
    pub cronjob: Option<CronScheduleParams>,
}

impl JobSchedule {
    pub fn new(params: JobScheduleParams) -> Result<Self> {
        let has_triggers =
            params.on_start.is_some() || params.on_stop.is_some() || params.on_delete.is_some();

        match (has_triggers, params.cronjob) {
            (true, None) => {
                for command in [&params.on_start, &params.on_stop, &params.on_delete]
                    .into_iter()
                    .flatten()
                {
                    command.validate()?;
                }
                Ok(JobSchedule::Lifecycle(LifecycleTriggers {
                    on_start: params.on_start,
                    on_stop: params.on_stop,
                    on_delete: params.on_delete,
                }))
            }
            (false, Some(cron)) => {
                validate_cron_expression(&cron.schedule)?;
                cron.command.validate()?;
                Ok(JobSchedule::Cron(CronSchedule {
                    schedule: cron.schedule.trim().to_string(),
                    command: cron.command,
                }))
            }
            (true, Some(_)) => Err(invalid(
                "schedule must set either lifecycle triggers or a cronjob, not both",
            )),
            (false, None) => Err(invalid(
                "schedule must set one of on_start, on_stop, on_delete or cronjob",
            )),
        }
    }
}

impl From<JobSchedule> for JobScheduleParams {
    fn from(schedule: JobSchedule) -> Self {
        match schedule {
            JobSchedule::Lifecycle(triggers) => JobScheduleParams {
                on_start: triggers.on_start,
                on_stop: triggers.on_stop,
                on_delete: triggers.on_delete,
                cronjob: None,
            },
            JobSchedule::Cron(cron) => JobScheduleParams {
                cronjob: Some(CronScheduleParams {
                    schedule: cron.schedule,
                    command: cron.command,
                }),
                ..Default::default()
            },
        }
    }
}

/// Five whitespace-separated fields: minute hour day-of-month month day-of-week
fn validate_cron_expression(expression: &str) -> Result<()> {
    let fields = expression.split_whitespace().count();
    if fields != 5 {
        return Err(invalid(format!(
            "cron schedule '{}' must have 5 fields, got {}",
            expression, fields
        )));
    }
    Ok(())
}

/// Caller-supplied parameters for creating or updating a job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobParams {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub auto_preview: Option<bool>,
    /// Millicores
    #[serde(default)]
    pub cpu: Option<u32>,
    /// Megabytes
    #[serde(default)]
    pub memory: Option<u32>,
    #[serde(default)]
    pub max_nb_restart: Option<u32>,
    #[serde(default)]
    pub max_duration_seconds: Option<u32>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub source: JobSourceParams,
    #[serde(default)]
    pub schedule: JobScheduleParams,
    #[serde(default)]
    pub environment_variables: Vec<VariableParams>,
    #[serde(default)]
    pub secrets: Vec<VariableParams>,
    #[serde(default)]
    pub deployment_stage_id: Option<String>,
}

/// Validated body of a job create or update call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobUpsertRequest {
    pub name: String,
    pub auto_preview: Option<bool>,
    pub cpu: Option<u32>,
    pub memory: Option<u32>,
    pub max_nb_restart: Option<u32>,
    pub max_duration_seconds: Option<u32>,
    pub port: Option<u16>,
    pub source: JobSource,
    pub schedule: JobSchedule,
    #[serde(skip)]
    pub environment_variables: Vec<VariableParams>,
    #[serde(skip)]
    pub secrets: Vec<VariableParams>,
    #[serde(skip)]
    pub deployment_stage_id: Option<String>,
}

impl JobUpsertRequest {
    pub fn new(params: JobParams) -> Result<Self> {
        if params.name.trim().is_empty() {
            return Err(invalid("name is required"));
        }
        if params.cpu == Some(0) {
            return Err(invalid("cpu must be greater than 0"));
        }
        if params.memory == Some(0) {
            return Err(invalid("memory must be greater than 0"));
        }
        if params.port == Some(0) {
            return Err(invalid("port must be greater than 0"));
        }
        let schedule = JobSchedule::new(params.schedule)?;
        let source = JobSource::new(params.source)?;
        variable::validate_params(VariableKind::EnvironmentVariable, &params.environment_variables)?;
        variable::validate_params(VariableKind::Secret, &params.secrets)?;

        let deployment_stage_id = params
            .deployment_stage_id
            .filter(|id| !id.trim().is_empty());

        Ok(Self {
            name: params.name,
            auto_preview: params.auto_preview,
            cpu: params.cpu,
            memory: params.memory,
            max_nb_restart: params.max_nb_restart,
            max_duration_seconds: params.max_duration_seconds,
            port: params.port,
            source,
            schedule,
            environment_variables: params.environment_variables,
            secrets: params.secrets,
            deployment_stage_id,
        })
    }
}

/// A job as known by the remote system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub environment_id: String,
    pub name: String,
    pub cpu: u32,
    pub memory: u32,
    pub max_nb_restart: u32,
    pub max_duration_seconds: u32,
    pub auto_preview: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub source: JobSource,
    pub schedule: JobSchedule,
    #[serde(default)]
    pub environment_variables: Vec<Variable>,
    #[serde(default)]
    pub built_in_environment_variables: Vec<Variable>,
    #[serde(default)]
    pub secrets: Vec<Variable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_stage_id: Option<String>,
}

impl Job {
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(invalid("id is required"));
        }
        if self.environment_id.trim().is_empty() {
            return Err(invalid("environment_id is required"));
        }
        if self.name.trim().is_empty() {
            return Err(invalid("name is required"));
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> CloudError {
    CloudError::invalid(ResourceKind::Job, reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_source() -> JobSourceParams {
        JobSourceParams {
            image: Some(ImageParams {
                registry_id: "registry-1".to_string(),
                name: "acme/worker".to_string(),
                tag: "1.2.0".to_string(),
            }),
            docker: None,
        }
    }

    fn on_start(entrypoint: &str) -> JobScheduleParams {
        JobScheduleParams {
            on_start: Some(ExecutionCommand {
                entrypoint: Some(entrypoint.to_string()),
                arguments: vec![],
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_name_is_required() {
        let err = JobUpsertRequest::new(JobParams {
            source: image_source(),
            schedule: on_start("/run.sh"),
            ..Default::default()
        })
        .unwrap_err();
        assert!(err.to_string().contains("name is required"));
    }

    #[test]
    fn test_source_rejects_both_and_neither() {
        let both = JobSourceParams {
            docker: Some(DockerParams {
                git_repository: GitRepositoryParams {
                    url: "https://github.com/acme/app.git".to_string(),
                    ..Default::default()
                },
                dockerfile_path: None,
            }),
            ..image_source()
        };
        assert!(JobSource::new(both).is_err());
        assert!(JobSource::new(JobSourceParams::default()).is_err());
    }

    #[test]
    fn test_source_docker_validates_git_repository() {
        let params = JobSourceParams {
            image: None,
            docker: Some(DockerParams::default()),
        };
        let err = JobSource::new(params).unwrap_err();
        assert!(err.to_string().contains("url is required"));
    }

    #[test]
    fn test_source_image_requires_tag() {
        let mut params = image_source();
        if let Some(image) = params.image.as_mut() {
            image.tag.clear();
        }
        let err = JobSource::new(params).unwrap_err();
        assert!(err.to_string().contains("image tag is required"));
    }

    #[test]
    fn test_schedule_rejects_both_and_neither() {
        let both = JobScheduleParams {
            cronjob: Some(CronScheduleParams {
                schedule: "0 * * * *".to_string(),
                command: ExecutionCommand::default(),
            }),
            ..on_start("/run.sh")
        };
        assert!(JobSchedule::new(both).is_err());
        assert!(JobSchedule::new(JobScheduleParams::default()).is_err());
    }

    #[test]
    fn test_schedule_cron() {
        let schedule = JobSchedule::new(JobScheduleParams {
            cronjob: Some(CronScheduleParams {
                schedule: " */5 * * * * ".to_string(),
                command: ExecutionCommand {
                    entrypoint: Some("/bin/report".to_string()),
                    arguments: vec!["--daily".to_string()],
                },
            }),
            ..Default::default()
        })
        .unwrap();

        match schedule {
            JobSchedule::Cron(cron) => {
                assert_eq!(cron.schedule, "*/5 * * * *");
                assert_eq!(cron.command.arguments, vec!["--daily".to_string()]);
            }
            other => panic!("expected cron schedule, got {other:?}"),
        }

        let bad = JobSchedule::new(JobScheduleParams {
            cronjob: Some(CronScheduleParams {
                schedule: "every hour".to_string(),
                command: ExecutionCommand::default(),
            }),
            ..Default::default()
        });
        assert!(bad.is_err());
    }

    #[test]
    fn test_empty_entrypoint_is_rejected() {
        assert!(JobSchedule::new(on_start("  ")).is_err());
    }

    #[test]
    fn test_blank_stage_id_is_dropped() {
        let request = JobUpsertRequest::new(JobParams {
            name: "svc".to_string(),
            source: image_source(),
            schedule: on_start("/run.sh"),
            deployment_stage_id: Some(String::new()),
            ..Default::default()
        })
        .unwrap();
        assert!(request.deployment_stage_id.is_none());
        assert!(matches!(request.source, JobSource::Image(_)));
        assert!(matches!(request.schedule, JobSchedule::Lifecycle(_)));
    }

    #[test]
    fn test_source_serializes_as_tagged_union() {
        let source = JobSource::new(image_source()).unwrap();
        let json = serde_json::to_value(&source).unwrap();
        assert_eq!(json["image"]["name"], "acme/worker");
    }
}
