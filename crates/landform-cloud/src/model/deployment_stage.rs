//! Deployment stages order how an environment's services are deployed

use crate::error::{CloudError, ResourceKind, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentStage {
    pub id: String,
    pub environment_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Zero-based rank within the environment, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_order: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentStageParams {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Place this stage right after the given stage
    #[serde(default)]
    pub move_after: Option<String>,
    /// Place this stage right before the given stage
    #[serde(default)]
    pub move_before: Option<String>,
}

/// Body of a create or update call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentStageRequest {
    pub name: String,
    pub description: String,
}

/// Validated parameters split into the body and the ordering directives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentStageUpsert {
    pub request: DeploymentStageRequest,
    pub move_after: Option<String>,
    pub move_before: Option<String>,
}

impl DeploymentStageUpsert {
    pub fn new(params: DeploymentStageParams) -> Result<Self> {
        if params.name.trim().is_empty() {
            return Err(invalid("name is required"));
        }
        let move_after = params.move_after.filter(|id| !id.trim().is_empty());
        let move_before = params.move_before.filter(|id| !id.trim().is_empty());
        if let (Some(after), Some(before)) = (&move_after, &move_before)
            && after == before
        {
            return Err(invalid(format!(
                "cannot move both after and before stage '{}'",
                after
            )));
        }

        Ok(Self {
            request: DeploymentStageRequest {
                name: params.name,
                description: params.description,
            },
            move_after,
            move_before,
        })
    }
}

fn invalid(reason: impl Into<String>) -> CloudError {
    CloudError::invalid(ResourceKind::DeploymentStage, reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_is_required() {
        assert!(DeploymentStageUpsert::new(DeploymentStageParams::default()).is_err());
    }

    #[test]
    fn test_blank_directives_are_ignored() {
        let upsert = DeploymentStageUpsert::new(DeploymentStageParams {
            name: "first".to_string(),
            move_after: Some(" ".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert!(upsert.move_after.is_none());
        assert!(upsert.move_before.is_none());
    }

    #[test]
    fn test_conflicting_directives_are_rejected() {
        let err = DeploymentStageUpsert::new(DeploymentStageParams {
            name: "first".to_string(),
            move_after: Some("stage-2".to_string()),
            move_before: Some("stage-2".to_string()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(err.to_string().contains("stage-2"));
    }
}
