//! Organizations own clusters and projects; they are never created or
//! deleted through this crate, only read and updated.

use crate::error::{CloudError, ResourceKind, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Plan {
    Free,
    Team,
    Business,
    Enterprise,
    Professional,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub plan: Plan,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationParams {
    pub name: String,
    pub plan: Plan,
    #[serde(default)]
    pub description: Option<String>,
}

impl OrganizationParams {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CloudError::invalid(
                ResourceKind::Organization,
                "name is required",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_wire_names() {
        let params: OrganizationParams =
            serde_json::from_str(r#"{"name": "acme", "plan": "ENTERPRISE"}"#).unwrap();
        assert_eq!(params.plan, Plan::Enterprise);
        assert!(params.validate().is_ok());

        let bad = serde_json::from_str::<OrganizationParams>(r#"{"name": "a", "plan": "GOLD"}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_name_is_required() {
        let params = OrganizationParams {
            name: " ".to_string(),
            plan: Plan::Free,
            description: None,
        };
        assert!(params.validate().is_err());
    }
}
