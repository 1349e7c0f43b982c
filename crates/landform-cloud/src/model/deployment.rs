//! Environment deployment
//!
//! A deployment is not a remote object of its own: it names an environment
//! and the lifecycle state that environment should be driven to. It is built
//! fresh from caller parameters on every call.

use crate::error::{CloudError, ResourceKind, Result};
use crate::state::{DesiredState, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentParams {
    /// Generated when absent
    #[serde(default)]
    pub id: Option<String>,
    pub environment_id: String,
    pub desired_state: String,
    /// Opaque token; changing it forces a redeploy
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: Uuid,
    pub environment_id: Uuid,
    pub desired_state: DesiredState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Environment state last observed on the platform; `None` until read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<State>,
}

impl Deployment {
    pub fn new(params: DeploymentParams) -> Result<Self> {
        let id = match params.id.as_deref().map(str::trim) {
            None | Some("") => Uuid::new_v4(),
            Some(raw) => parse_uuid("id", raw)?,
        };
        let environment_id = parse_uuid("environment_id", params.environment_id.trim())?;
        let desired_state = DesiredState::parse(&params.desired_state).ok_or_else(|| {
            invalid(format!(
                "desired_state '{}' must be one of DEPLOYED, STOPPED, RESTARTED, DELETED",
                params.desired_state
            ))
        })?;

        Ok(Self {
            id,
            environment_id,
            desired_state,
            version: params.version.filter(|v| !v.is_empty()),
            state: None,
        })
    }

    /// Environment identifier as used in remote paths
    pub fn environment(&self) -> String {
        self.environment_id.to_string()
    }
}

fn parse_uuid(field: &str, raw: &str) -> Result<Uuid> {
    if raw.is_empty() {
        return Err(invalid(format!("{} is required", field)));
    }
    Uuid::parse_str(raw).map_err(|e| invalid(format!("{} '{}' is not a UUID: {}", field, raw, e)))
}

fn invalid(reason: impl Into<String>) -> CloudError {
    CloudError::invalid(ResourceKind::Deployment, reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENV: &str = "6f1a2d9c-3b47-4c1e-9a55-0e2b8f7c1d20";

    #[test]
    fn test_generates_id_when_absent() {
        let a = Deployment::new(DeploymentParams {
            environment_id: ENV.to_string(),
            desired_state: "DEPLOYED".to_string(),
            ..Default::default()
        })
        .unwrap();
        let b = Deployment::new(DeploymentParams {
            id: Some(String::new()),
            environment_id: ENV.to_string(),
            desired_state: "deployed".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.environment(), ENV);
        assert_eq!(b.desired_state, DesiredState::Deployed);
        assert_eq!(a.state, None);
    }

    #[test]
    fn test_keeps_supplied_id() {
        let id = "0b8e6f3a-41d2-4f0e-8c5d-7a1e2b3c4d5e";
        let deployment = Deployment::new(DeploymentParams {
            id: Some(id.to_string()),
            environment_id: ENV.to_string(),
            desired_state: "STOPPED".to_string(),
            version: Some("v2".to_string()),
        })
        .unwrap();
        assert_eq!(deployment.id.to_string(), id);
        assert_eq!(deployment.version.as_deref(), Some("v2"));
    }

    #[test]
    fn test_rejects_bad_environment_id() {
        let err = Deployment::new(DeploymentParams {
            environment_id: "not-a-uuid".to_string(),
            desired_state: "DEPLOYED".to_string(),
            ..Default::default()
        })
        .unwrap_err();
        assert!(err.to_string().contains("environment_id 'not-a-uuid' is not a UUID"));
    }

    #[test]
    fn test_rejects_unknown_desired_state() {
        let err = Deployment::new(DeploymentParams {
            environment_id: ENV.to_string(),
            desired_state: "RUNNING".to_string(),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, CloudError::InvalidParams { .. }));
    }
}
