//! Error taxonomy for reconciliation operations
//!
//! Every failure coming back from a repository or the status poller is an
//! [`ApiError`]: the operation that failed, the kind of resource, the remote
//! identifier and a [`Cause`]. Validation failures never reach the remote
//! system and are reported as [`CloudError::InvalidParams`].

use crate::state::{DesiredState, State};
use thiserror::Error;

/// Operation being performed when an error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Deploy,
    Stop,
    StatusCheck,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::Read => write!(f, "read"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
            Operation::Deploy => write!(f, "deploy"),
            Operation::Stop => write!(f, "stop"),
            Operation::StatusCheck => write!(f, "check status of"),
        }
    }
}

/// Kind of remote resource an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Cluster,
    ClusterCloudProvider,
    ClusterRoutingTable,
    ClusterAdvancedSettings,
    Deployment,
    DeploymentStage,
    Environment,
    EnvironmentVariable,
    GitRepository,
    Job,
    Organization,
    Secret,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResourceKind::Cluster => "cluster",
            ResourceKind::ClusterCloudProvider => "cluster cloud provider info",
            ResourceKind::ClusterRoutingTable => "cluster routing table",
            ResourceKind::ClusterAdvancedSettings => "cluster advanced settings",
            ResourceKind::Deployment => "deployment",
            ResourceKind::DeploymentStage => "deployment stage",
            ResourceKind::Environment => "environment",
            ResourceKind::EnvironmentVariable => "environment variable",
            ResourceKind::GitRepository => "git repository",
            ResourceKind::Job => "job",
            ResourceKind::Organization => "organization",
            ResourceKind::Secret => "secret",
        };
        f.write_str(name)
    }
}

/// Why an operation against the remote system failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Cause {
    #[error("resource not found")]
    NotFound,

    #[error("unexpected status code {code}: {message}")]
    Status { code: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("deadline exceeded")]
    Timeout,

    #[error("operation cancelled")]
    Cancelled,

    #[error("resource reached failure state {0}")]
    FailedState(State),
}

/// An operation-scoped error: `{operation} x {resource} x {id}` plus a cause
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to {operation} {resource} '{id}': {cause}")]
pub struct ApiError {
    pub operation: Operation,
    pub resource: ResourceKind,
    pub id: String,
    pub cause: Cause,
}

impl ApiError {
    pub fn new(
        operation: Operation,
        resource: ResourceKind,
        id: impl Into<String>,
        cause: Cause,
    ) -> Self {
        Self {
            operation,
            resource,
            id: id.into(),
            cause,
        }
    }

    /// Builds an error from an HTTP status code, classifying 404 as not-found
    pub fn from_status(
        operation: Operation,
        resource: ResourceKind,
        id: impl Into<String>,
        code: u16,
        message: impl Into<String>,
    ) -> Self {
        let cause = if code == 404 {
            Cause::NotFound
        } else {
            Cause::Status {
                code,
                message: message.into(),
            }
        };
        Self::new(operation, resource, id, cause)
    }

    /// Builds an error for a request that never produced a response
    pub fn transport(
        operation: Operation,
        resource: ResourceKind,
        id: impl Into<String>,
        error: impl std::fmt::Display,
    ) -> Self {
        Self::new(operation, resource, id, Cause::Transport(error.to_string()))
    }

    pub fn not_found(operation: Operation, resource: ResourceKind, id: impl Into<String>) -> Self {
        Self::new(operation, resource, id, Cause::NotFound)
    }

    pub fn is_not_found(&self) -> bool {
        self.cause == Cause::NotFound
    }

    /// Status code observed on the response, if there was one
    pub fn status_code(&self) -> Option<u16> {
        match self.cause {
            Cause::NotFound => Some(404),
            Cause::Status { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Errors surfaced by reconciliation services
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("invalid {resource} parameters: {reason}")]
    InvalidParams {
        resource: ResourceKind,
        reason: String,
    },

    #[error("desired state {0} is forbidden at creation")]
    DesiredStateForbiddenAtCreation(DesiredState),

    #[error("{operation} is not allowed for {resource}")]
    NotAllowed {
        operation: Operation,
        resource: ResourceKind,
    },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    pub fn invalid(resource: ResourceKind, reason: impl Into<String>) -> Self {
        CloudError::InvalidParams {
            resource,
            reason: reason.into(),
        }
    }

    /// Whether the error reports an absent remote resource
    pub fn is_not_found(&self) -> bool {
        matches!(self, CloudError::Api(e) if e.is_not_found())
    }

    pub fn api(&self) -> Option<&ApiError> {
        match self {
            CloudError::Api(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classifies_not_found() {
        let err = ApiError::from_status(
            Operation::Read,
            ResourceKind::Job,
            "job-1",
            404,
            "missing",
        );
        assert!(err.is_not_found());
        assert_eq!(err.status_code(), Some(404));

        let err = ApiError::from_status(
            Operation::Update,
            ResourceKind::Job,
            "job-1",
            409,
            "conflict",
        );
        assert!(!err.is_not_found());
        assert_eq!(err.status_code(), Some(409));
    }

    #[test]
    fn test_transport_error_has_no_status_code() {
        let err = ApiError::transport(
            Operation::Create,
            ResourceKind::Cluster,
            "prod",
            "connection refused",
        );
        assert_eq!(err.status_code(), None);
        assert_eq!(
            err.to_string(),
            "failed to create cluster 'prod': transport error: connection refused"
        );
    }

    #[test]
    fn test_cloud_error_not_found_query() {
        let err: CloudError =
            ApiError::not_found(Operation::Delete, ResourceKind::DeploymentStage, "s1").into();
        assert!(err.is_not_found());

        let err = CloudError::invalid(ResourceKind::Job, "name is required");
        assert!(!err.is_not_found());
        assert!(err.api().is_none());
    }

    #[test]
    fn test_status_check_message_includes_id() {
        let err = ApiError::new(
            Operation::StatusCheck,
            ResourceKind::Environment,
            "env-1",
            Cause::FailedState(State::DeploymentError),
        );
        assert_eq!(
            err.to_string(),
            "failed to check status of environment 'env-1': resource reached failure state DEPLOYMENT_ERROR"
        );
    }
}
